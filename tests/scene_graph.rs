use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use canvas2d::prelude::*;
use canvas2d::tiny_skia::Pixmap;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scene(width: u32, height: u32) -> Scene {
    init_logger();
    let mut scene = Scene::headless(width, height, 1.0);
    scene.add_layer(LayerId(0)).unwrap();
    scene
}

/// A full-size container at the top-left, attached to layer 0.
fn root(scene: &mut Scene) -> NodeId {
    let root = scene.container("root");
    scene.add_root(LayerId(0), root).unwrap();
    scene
        .attr(root, &StylePatch::new().left(0.0).top(0.0))
        .unwrap();
    root
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

/// Deterministic pseudo-random sequence
fn lcg(seed: &mut u64) -> u64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *seed >> 33
}

#[test]
fn matrix_times_inverse_is_identity() {
    let m = Matrix::IDENTITY
        .translate(-5.0, 3.0)
        .scale(2.0, 0.5)
        .rotate(33.0)
        .translate(40.0, -7.0);
    assert!(m.compose(&m.invert(), false).approx_eq(&Matrix::IDENTITY, 1e-4));
    assert!(m.compose(&m.invert(), true).approx_eq(&Matrix::IDENTITY, 1e-4));
}

#[test]
fn percentages_resolve_against_content_box() {
    let mut scene = scene(400, 300);
    let root = root(&mut scene);
    scene
        .attr(root, &StylePatch::new().border(10.0, Color::BLACK))
        .unwrap();
    let child = scene.div("child");
    scene.add(root, child).unwrap();
    scene
        .attr(child, &StylePatch::new().left("25%").width("50%").top(0.0).height(20.0))
        .unwrap();

    // Content box is 380 wide
    let rect = scene.bounding_rect(child).unwrap();
    assert!(approx(rect.x, 10.0 + 95.0));
    assert!(approx(rect.width, 190.0));

    // No mutation, same answer
    assert_eq!(scene.bounding_rect(child), Some(rect));
}

#[test]
fn unpositioned_node_is_centered() {
    let mut scene = scene(400, 300);
    let root = root(&mut scene);
    let child = scene.div("child");
    scene.add(root, child).unwrap();
    scene
        .attr(child, &StylePatch::new().size(100.0, 50.0))
        .unwrap();

    let rect = scene.bounding_rect(child).unwrap();
    assert_eq!((rect.x, rect.y), (150.0, 125.0));
}

#[test]
fn random_z_insertions_stay_sorted() {
    let mut scene = scene(100, 100);
    let root = root(&mut scene);
    let mut seed = 42;

    for i in 0..100 {
        let child = scene.div(&format!("child-{i}"));
        let z = (lcg(&mut seed) % 7) as i32 - 3;
        scene.attr(child, &StylePatch::new().z_index(z)).unwrap();
        scene.add(root, child).unwrap();

        let zs: Vec<_> = scene
            .children(root)
            .iter()
            .map(|c| scene.get(*c).unwrap().style().z_index)
            .collect();
        assert!(zs.windows(2).all(|w| w[0] <= w[1]), "unsorted after {i}: {zs:?}");
    }
}

#[test]
fn geometry_mutation_marks_ancestors_and_layer() {
    let mut scene = scene(100, 100);
    let root = root(&mut scene);
    let mid = scene.container("mid");
    let leaf = scene.div("leaf");
    scene.add(root, mid).unwrap();
    scene.add(mid, leaf).unwrap();
    assert!(!scene.render(None));
    assert!(!scene.tree().has_dirty_layers());

    scene.attr(leaf, &StylePatch::new().rotation(15.0)).unwrap();
    for id in [root, mid, leaf] {
        assert!(scene.get(id).unwrap().needs_repaint());
    }
    assert!(scene.get(leaf).unwrap().needs_layout());
    assert!(scene.tree().has_dirty_layers());

    scene.render(None);
    scene
        .attr(leaf, &StylePatch::new().background(Color::WHITE))
        .unwrap();
    assert!(scene.get(leaf).unwrap().needs_repaint());
    assert!(!scene.get(leaf).unwrap().needs_layout());
}

#[test]
fn rotated_and_scaled_node_is_hit_by_shape() {
    let mut scene = scene(200, 200);
    let root = root(&mut scene);
    let node = scene.div("node");
    scene.add(root, node).unwrap();
    // 20x10 centered at (100, 100), turned on its side and doubled: 20 wide, 40 tall
    scene
        .attr(
            node,
            &StylePatch::new()
                .size(20.0, 10.0)
                .left(90.0)
                .top(95.0)
                .rotation(90.0)
                .scale(2.0, 2.0),
        )
        .unwrap();

    let rect = scene.bounding_rect(node).unwrap();
    assert!(approx(rect.width, 20.0) && approx(rect.height, 40.0));

    assert_eq!(scene.get_target(LayerId(0), 100.0, 100.0), Some(node));
    assert_eq!(scene.get_target(LayerId(0), 92.0, 118.0), Some(node));
    // One pixel past the rotated edges falls through to the container
    assert_eq!(scene.get_target(LayerId(0), 100.0, 121.0), Some(root));
    assert_eq!(scene.get_target(LayerId(0), 111.0, 100.0), Some(root));
}

#[test]
fn reparenting_moves_node_exactly_once() {
    let mut scene = scene(100, 100);
    let root = root(&mut scene);
    let a = scene.container("a");
    let b = scene.container("b");
    let child = scene.div("child");
    scene.add(root, a).unwrap();
    scene.add(root, b).unwrap();
    scene.add(a, child).unwrap();

    scene.add(b, child).unwrap();
    scene.add(b, child).unwrap();

    assert!(scene.children(a).is_empty());
    assert_eq!(scene.children(b), &[child]);
    assert_eq!(scene.parent(child), Some(b));

    // Promoting to a root takes it out of `b`
    scene.add_root(LayerId(0), child).unwrap();
    assert!(scene.children(b).is_empty());
    assert_eq!(scene.parent(child), None);
    assert_eq!(scene.layer(LayerId(0)).unwrap().roots().len(), 2);
}

#[test]
fn dispose_during_in_flight_walk() {
    let mut scene = scene(100, 100);
    let root = root(&mut scene);
    let children: Vec<_> = (0..6)
        .map(|i| {
            let child = scene.div(&format!("child-{i}"));
            scene.add(root, child).unwrap();
            scene
                .attr(child, &StylePatch::new().size(10.0, 10.0).background(Color::BLACK))
                .unwrap();
            child
        })
        .collect();

    // A zero budget paints one item per frame
    assert!(scene.render(Some(Duration::ZERO)));
    assert!(scene.layer(LayerId(0)).unwrap().is_painting());

    scene.remove(children[3], true).unwrap();
    assert!(!scene.contains(children[3]));
    assert!(!scene.children(root).contains(&children[3]));

    let mut frames = 0;
    while scene.render(Some(Duration::ZERO)) {
        frames += 1;
        assert!(frames < 50, "walk never finished");
    }
    assert!(!scene.layer(LayerId(0)).unwrap().is_painting());
}

/// Reports `Pending` until it has been polled `polls` times.
struct SlowLoader {
    polls: Cell<usize>,
    bitmap: Arc<Pixmap>,
}

impl ResourceLoader for SlowLoader {
    fn load(&mut self, _src: &str) {}

    fn release(&mut self, _src: &str) {}

    fn get(&self, _src: &str) -> Resource {
        if self.polls.get() == 0 {
            Resource::Ready(self.bitmap.clone())
        } else {
            Resource::Pending
        }
    }

    fn poll(&mut self) -> bool {
        match self.polls.get() {
            0 => false,
            n => {
                self.polls.set(n - 1);
                n == 1
            }
        }
    }
}

#[test]
fn pending_image_suspends_then_resumes() {
    init_logger();
    let mut bitmap = Pixmap::new(30, 20).unwrap();
    bitmap.fill(canvas2d::tiny_skia::Color::from_rgba8(255, 0, 0, 255));
    let mut scene = Scene::headless(100, 100, 1.0).with_resources(SlowLoader {
        polls: Cell::new(2),
        bitmap: Arc::new(bitmap),
    });
    scene.add_layer(LayerId(0)).unwrap();
    let root = root(&mut scene);
    let image = scene.image("photo", "photo.png");
    scene.add(root, image).unwrap();
    scene
        .attr(image, &StylePatch::new().left(0.0).top(0.0))
        .unwrap();

    // First poll leaves it pending
    assert!(scene.render(None));
    assert!(scene.layer(LayerId(0)).unwrap().is_waiting());
    assert_eq!(scene.bounding_rect(image), None);

    // Second poll makes it ready and the walk finishes
    assert!(!scene.render(None));
    assert_eq!(
        scene.bounding_rect(image),
        Some(BoundingRect::new(0.0, 0.0, 30.0, 20.0))
    );
    let front = scene.layer(LayerId(0)).unwrap().front();
    assert_eq!(front.pixel(10, 10).unwrap().red(), 255);
    assert_eq!(front.pixel(50, 50).unwrap().alpha(), 0);
}

#[test]
fn image_keeps_aspect_ratio_with_one_fixed_side() {
    init_logger();
    let bitmap = Pixmap::new(40, 20).unwrap();
    let mut scene = Scene::headless(200, 200, 1.0).with_resources(SlowLoader {
        polls: Cell::new(0),
        bitmap: Arc::new(bitmap),
    });
    scene.add_layer(LayerId(0)).unwrap();
    let root = root(&mut scene);
    let image = scene.image("photo", "photo.png");
    scene.add(root, image).unwrap();
    scene.attr(image, &StylePatch::new().width(100.0)).unwrap();

    let rect = scene.bounding_rect(image).unwrap();
    assert_eq!((rect.width, rect.height), (100.0, 50.0));
}

#[test]
fn missing_image_paints_outlined_placeholder() {
    let mut scene = scene(100, 100);
    let root = root(&mut scene);
    let image = scene.image("broken", "does-not-exist.png");
    scene.add(root, image).unwrap();
    scene
        .attr(image, &StylePatch::new().left(10.0).top(10.0))
        .unwrap();

    assert!(!scene.render(None));
    assert_eq!(
        scene.bounding_rect(image),
        Some(BoundingRect::new(10.0, 10.0, 24.0, 24.0))
    );

    let front = scene.layer(LayerId(0)).unwrap().front();
    // Outline on the edges, nothing inside
    assert!(front.pixel(10, 20).unwrap().alpha() > 0);
    assert!(front.pixel(33, 20).unwrap().alpha() > 0);
    assert!(front.pixel(20, 10).unwrap().alpha() > 0);
    assert_eq!(front.pixel(22, 22).unwrap().alpha(), 0);
}

#[test]
fn vertical_stack_places_children() {
    let mut scene = scene(200, 200);
    let root = root(&mut scene);
    let stack = scene.stack("stack", true);
    scene.add(root, stack).unwrap();
    scene
        .attr(stack, &StylePatch::new().left(0.0).top(0.0))
        .unwrap();

    let title = scene.text("title", "hello world", Font::new(10.0));
    let body = scene.div("body");
    scene.add(stack, title).unwrap();
    scene.add(stack, body).unwrap();
    scene
        .attr(title, &StylePatch::new().width(36.0).left(0.0))
        .unwrap();
    scene
        .attr(body, &StylePatch::new().size(50.0, 30.0).left(0.0).top(4.0))
        .unwrap();

    // Six 6px glyphs per line: "hello " / "world" is two 12px lines
    let title_rect = scene.bounding_rect(title).unwrap();
    assert_eq!(title_rect.height, 24.0);
    let body_rect = scene.bounding_rect(body).unwrap();
    assert_eq!(body_rect.y, 28.0);
    let stack_rect = scene.bounding_rect(stack).unwrap();
    assert_eq!((stack_rect.width, stack_rect.height), (50.0, 58.0));

    // Growing a child pushes its later siblings down
    scene.set_text(title, "hello world again").unwrap();
    assert_eq!(scene.bounding_rect(body).unwrap().y, 40.0);
}

#[test]
fn hit_test_prefers_higher_layers() {
    let mut scene = scene(100, 100);
    let low = root(&mut scene);
    scene.add_layer(LayerId(5)).unwrap();
    let high = scene.div("overlay");
    scene.add_root(LayerId(5), high).unwrap();
    scene
        .attr(high, &StylePatch::new().size(20.0, 20.0).left(0.0).top(0.0))
        .unwrap();

    assert_eq!(scene.hit_test(10.0, 10.0), Some(high));
    assert_eq!(scene.hit_test(50.0, 50.0), Some(low));

    scene.set_visible(high, false).unwrap();
    assert_eq!(scene.hit_test(10.0, 10.0), Some(low));
}

#[test]
fn engine_click_reaches_handler() {
    init_logger();
    let config = EngineConfig::default()
        .size(100, 100)
        .frame_budget(None);
    let mut engine = Engine::with_scene(config, Scene::headless(100, 100, 1.0)).unwrap();

    let scene = engine.scene_mut();
    let root = root(scene);
    let button = scene.div("button");
    scene.add(root, button).unwrap();
    scene
        .attr(
            button,
            &StylePatch::new()
                .size(30.0, 30.0)
                .left(10.0)
                .top(10.0)
                .background(Color::BLACK),
        )
        .unwrap();
    engine.frame();

    engine.on(button, EventKind::Click, |scene, event| {
        scene
            .attr(event.target, &StylePatch::new().background(Color::WHITE))
            .unwrap();
        EventResponse::Handled
    });
    engine.handle_pointer(PointerInput::Down { x: 20.0, y: 20.0 }, PointerSource::Mouse);
    engine.handle_pointer(PointerInput::Up { x: 20.0, y: 20.0 }, PointerSource::Mouse);
    engine.frame();

    let pixel = engine.display().pixel(20, 20).unwrap();
    assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (255, 255, 255));
}
