//! The host-facing driver.
//!
//! [`Engine`] owns a [`Scene`] and one display surface. The host feeds it
//! pointer input and calls [`Engine::frame`] once per display refresh; each
//! frame applies animation patches, advances every layer's paint walk within
//! the frame budget and composites the layers onto the display.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use resvg::tiny_skia::Pixmap;

use crate::animation::AnimationSource;
use crate::canvas::Canvas;
use crate::error::ResourceError;
use crate::event::{
    Event, EventKind, EventResponse, Handler, HandlerId, PointerInput, PointerSource,
};
use crate::layer::LayerId;
use crate::resource::ImageCache;
use crate::scene::Scene;
use crate::style::Color;
use crate::tree::NodeId;

pub struct EngineConfig {
    /// Logical width of the display
    pub width: u32,
    /// Logical height of the display
    pub height: u32,
    pub device_pixel_ratio: f32,
    /// Paint time per frame; `None` paints every walk to completion
    pub frame_budget: Option<Duration>,
    pub background: Color,
    /// Decoded images kept around after their last reference is released
    pub image_cache_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            device_pixel_ratio: 1.0,
            frame_budget: Some(Duration::from_millis(8)),
            background: Color::WHITE,
            image_cache_limit: 64,
        }
    }
}

impl EngineConfig {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn device_pixel_ratio(mut self, dpr: f32) -> Self {
        self.device_pixel_ratio = dpr;
        self
    }

    pub fn frame_budget(mut self, budget: Option<Duration>) -> Self {
        self.frame_budget = budget;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn image_cache_limit(mut self, limit: usize) -> Self {
        self.image_cache_limit = limit;
        self
    }

    fn dpr(&self) -> f32 {
        if self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Display size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        let dpr = self.dpr();
        (
            (self.width as f32 * dpr).round() as u32,
            (self.height as f32 * dpr).round() as u32,
        )
    }
}

struct Registration {
    id: HandlerId,
    kind: EventKind,
    handler: Handler,
}

pub struct Engine {
    config: EngineConfig,
    scene: Scene,
    display: Canvas,
    handlers: HashMap<NodeId, Vec<Registration>>,
    next_handler: u64,
    hovered: Option<NodeId>,
    pressed: Option<NodeId>,
    animations: Vec<Box<dyn AnimationSource>>,
}

impl Engine {
    /// An engine with the default image cache, system fonts and one layer
    /// at z-index 0.
    pub fn new(config: EngineConfig) -> Result<Self, ResourceError> {
        let (width, height) = config.device_size();
        let scene = Scene::new(width, height, config.dpr())
            .with_resources(ImageCache::new(config.image_cache_limit));
        Self::with_scene(config, scene)
    }

    /// Drive an existing scene. The scene is resized to the display.
    pub fn with_scene(config: EngineConfig, mut scene: Scene) -> Result<Self, ResourceError> {
        let (width, height) = config.device_size();
        if scene.size() != (width, height) {
            scene.resize(width, height)?;
        }
        scene.add_layer(LayerId(0))?;
        let display = Canvas::new(width, height)?;
        log::info!(
            "engine started at {width}x{height} (dpr {})",
            config.dpr()
        );

        Ok(Self {
            config,
            scene,
            display,
            handlers: HashMap::new(),
            next_handler: 0,
            hovered: None,
            pressed: None,
            animations: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Resize the display, in logical pixels.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        self.config.width = width;
        self.config.height = height;
        let (width, height) = self.config.device_size();
        self.display.resize(width, height)?;
        self.scene.resize(width, height)
    }

    pub fn add_animation(&mut self, source: impl AnimationSource + 'static) {
        self.animations.push(Box::new(source));
    }

    /// Listen for `kind` events on `node`, including those bubbling up from
    /// its descendants.
    pub fn on(
        &mut self,
        node: NodeId,
        kind: EventKind,
        handler: impl FnMut(&mut Scene, &Event) -> EventResponse + 'static,
    ) -> HandlerId {
        self.next_handler += 1;
        let id = HandlerId(self.next_handler);
        self.handlers.entry(node).or_default().push(Registration {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    pub fn off(&mut self, id: HandlerId) -> bool {
        let mut removed = false;
        for registrations in self.handlers.values_mut() {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            removed |= registrations.len() != before;
        }
        self.handlers.retain(|_, r| !r.is_empty());
        removed
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Feed one pointer input. Returns true if a handler reported
    /// [`EventResponse::Handled`].
    pub fn handle_pointer(&mut self, input: PointerInput, source: PointerSource) -> bool {
        self.forget_stale_nodes();
        let dpr = self.config.dpr();

        match input {
            PointerInput::Move { x, y } => {
                let (x, y) = (x * dpr, y * dpr);
                let target = self.scene.hit_test(x, y);
                let mut handled = self.update_hover(target, x, y, source);
                if let Some(target) = target {
                    handled |= self.dispatch(EventKind::PointerMove, target, None, x, y, source);
                }
                handled
            }
            PointerInput::Down { x, y } => {
                let (x, y) = (x * dpr, y * dpr);
                let target = self.scene.hit_test(x, y);
                let mut handled = self.update_hover(target, x, y, source);
                self.pressed = target;
                if let Some(target) = target {
                    handled |= self.dispatch(EventKind::PointerDown, target, None, x, y, source);
                }
                handled
            }
            PointerInput::Up { x, y } => {
                let (x, y) = (x * dpr, y * dpr);
                let target = self.scene.hit_test(x, y);
                let pressed = self.pressed.take();
                let mut handled = false;
                if let Some(target) = target {
                    handled |= self.dispatch(EventKind::PointerUp, target, None, x, y, source);
                    if pressed == Some(target) {
                        handled |= self.dispatch(EventKind::Click, target, None, x, y, source);
                    }
                }
                // A lifted finger no longer hovers anything
                if source == PointerSource::Touch {
                    handled |= self.update_hover(None, x, y, source);
                }
                handled
            }
            PointerInput::Leave => {
                self.pressed = None;
                self.update_hover(None, 0.0, 0.0, source)
            }
            PointerInput::Cancel => {
                let mut handled = false;
                if let Some(target) = self.pressed.take().or(self.hovered) {
                    handled |=
                        self.dispatch(EventKind::PointerCancel, target, None, 0.0, 0.0, source);
                }
                if source == PointerSource::Touch {
                    handled |= self.update_hover(None, 0.0, 0.0, source);
                }
                handled
            }
        }
    }

    /// Send leave/enter when the hovered node changes.
    fn update_hover(&mut self, target: Option<NodeId>, x: f32, y: f32, source: PointerSource) -> bool {
        if target == self.hovered {
            return false;
        }
        let previous = std::mem::replace(&mut self.hovered, target);

        let mut handled = false;
        if let Some(previous) = previous {
            handled |= self.dispatch(EventKind::PointerLeave, previous, target, x, y, source);
        }
        if let Some(target) = target {
            handled |= self.dispatch(EventKind::PointerEnter, target, previous, x, y, source);
        }
        handled
    }

    /// Run handlers on `target` and then on each container above it until
    /// one reports `Handled`.
    fn dispatch(
        &mut self,
        kind: EventKind,
        target: NodeId,
        related_target: Option<NodeId>,
        x: f32,
        y: f32,
        source: PointerSource,
    ) -> bool {
        if !self.scene.contains(target) {
            return false;
        }
        let mut path = vec![target];
        path.extend(self.scene.tree().ancestors(target));
        log::trace!("{kind:?} on {target:?}");

        for current_target in path {
            let Some(mut registrations) = self.handlers.remove(&current_target) else {
                continue;
            };

            let event = Event {
                kind,
                x,
                y,
                source,
                target,
                current_target,
                related_target,
            };
            let mut handled = false;
            for registration in registrations.iter_mut().filter(|r| r.kind == kind) {
                if (registration.handler)(&mut self.scene, &event) == EventResponse::Handled {
                    handled = true;
                }
            }

            // Keep handlers registered while this node's were running
            if let Some(mut added) = self.handlers.remove(&current_target) {
                registrations.append(&mut added);
            }
            self.handlers.insert(current_target, registrations);

            if handled {
                return true;
            }
        }
        false
    }

    /// Drop handlers and pointer state that refer to disposed nodes.
    fn forget_stale_nodes(&mut self) {
        let scene = &self.scene;
        self.handlers.retain(|node, _| scene.contains(*node));
        if self.hovered.is_some_and(|n| !scene.contains(n)) {
            self.hovered = None;
        }
        if self.pressed.is_some_and(|n| !scene.contains(n)) {
            self.pressed = None;
        }
    }

    /// Produce one frame. Returns true while more frames are needed
    /// (unfinished walks, pending images or running animations).
    pub fn frame(&mut self) -> bool {
        self.frame_at(Instant::now())
    }

    /// [`frame`](Engine::frame) with an explicit animation clock.
    pub fn frame_at(&mut self, now: Instant) -> bool {
        for source in &mut self.animations {
            let patches = source.frame(now);
            self.scene.apply_patches(patches);
        }
        self.animations.retain(|source| !source.is_finished());
        self.forget_stale_nodes();

        let busy = self.scene.render(self.config.frame_budget);

        self.display.clear();
        self.display.fill(self.config.background);
        for layer in self.scene.layers() {
            self.display.draw_pixmap(layer.front().as_ref(), 0.0, 0.0);
        }

        busy || !self.animations.is_empty()
    }

    /// The composited display.
    pub fn display(&self) -> &Pixmap {
        self.display.pixmap()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ResourceError> {
        self.display.save_png(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StylePatch;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> Engine {
        let config = EngineConfig::default()
            .size(100, 100)
            .frame_budget(None)
            .background(Color::WHITE);
        let scene = Scene::headless(100, 100, 1.0);
        Engine::with_scene(config, scene).unwrap()
    }

    /// A 40x40 box at (10, 10) inside a full-size root container.
    fn scene_with_box(engine: &mut Engine) -> (NodeId, NodeId) {
        let scene = engine.scene_mut();
        let root = scene.container("root");
        let item = scene.div("box");
        scene.add_root(LayerId(0), root).unwrap();
        scene.add(root, item).unwrap();
        scene
            .attr(
                item,
                &StylePatch::new()
                    .size(40.0, 40.0)
                    .left(10.0)
                    .top(10.0)
                    .background(Color::BLACK),
            )
            .unwrap();
        (root, item)
    }

    fn recorder(engine: &mut Engine, node: NodeId, kinds: &[EventKind]) -> Rc<RefCell<Vec<(EventKind, NodeId)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in kinds {
            let log = log.clone();
            engine.on(node, *kind, move |_, event| {
                log.borrow_mut().push((event.kind, event.current_target));
                EventResponse::Ignored
            });
        }
        log
    }

    #[test]
    fn test_frame_composites_layers() {
        let mut engine = engine();
        scene_with_box(&mut engine);
        assert!(!engine.frame());

        let inside = engine.display().pixel(20, 20).unwrap();
        assert_eq!((inside.red(), inside.alpha()), (0, 255));
        let outside = engine.display().pixel(80, 80).unwrap();
        assert_eq!(outside.red(), 255);
    }

    #[test]
    fn test_click_bubbles_to_ancestors() {
        let mut engine = engine();
        let (root, item) = scene_with_box(&mut engine);
        engine.frame();
        let log = recorder(&mut engine, root, &[EventKind::Click]);
        let own = recorder(&mut engine, item, &[EventKind::Click]);

        engine.handle_pointer(PointerInput::Down { x: 20.0, y: 20.0 }, PointerSource::Mouse);
        engine.handle_pointer(PointerInput::Up { x: 25.0, y: 25.0 }, PointerSource::Mouse);

        assert_eq!(*own.borrow(), vec![(EventKind::Click, item)]);
        assert_eq!(*log.borrow(), vec![(EventKind::Click, root)]);
    }

    #[test]
    fn test_no_click_when_release_elsewhere() {
        let mut engine = engine();
        let (_, item) = scene_with_box(&mut engine);
        let log = recorder(&mut engine, item, &[EventKind::Click]);

        engine.handle_pointer(PointerInput::Down { x: 20.0, y: 20.0 }, PointerSource::Mouse);
        engine.handle_pointer(PointerInput::Up { x: 90.0, y: 90.0 }, PointerSource::Mouse);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handled_stops_propagation() {
        let mut engine = engine();
        let (root, item) = scene_with_box(&mut engine);
        let log = recorder(&mut engine, root, &[EventKind::PointerDown]);
        engine.on(item, EventKind::PointerDown, |_, _| EventResponse::Handled);

        assert!(engine.handle_pointer(PointerInput::Down { x: 20.0, y: 20.0 }, PointerSource::Mouse));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_enter_and_leave_pairs() {
        let mut engine = engine();
        let (root, item) = scene_with_box(&mut engine);
        let log = recorder(
            &mut engine,
            item,
            &[EventKind::PointerEnter, EventKind::PointerLeave],
        );

        engine.handle_pointer(PointerInput::Move { x: 80.0, y: 80.0 }, PointerSource::Mouse);
        assert_eq!(engine.hovered(), Some(root));
        engine.handle_pointer(PointerInput::Move { x: 20.0, y: 20.0 }, PointerSource::Mouse);
        engine.handle_pointer(PointerInput::Move { x: 21.0, y: 21.0 }, PointerSource::Mouse);
        engine.handle_pointer(PointerInput::Leave, PointerSource::Mouse);

        assert_eq!(
            *log.borrow(),
            vec![(EventKind::PointerEnter, item), (EventKind::PointerLeave, item)]
        );
        assert_eq!(engine.hovered(), None);
    }

    #[test]
    fn test_device_pixel_ratio_scales_input() {
        let config = EngineConfig::default()
            .size(50, 50)
            .device_pixel_ratio(2.0)
            .frame_budget(None);
        let scene = Scene::headless(1, 1, 2.0);
        let mut engine = Engine::with_scene(config, scene).unwrap();
        let (_, item) = scene_with_box(&mut engine);
        assert_eq!(engine.display().width(), 100);

        // The box spans logical 10..50, device 20..100
        let log = recorder(&mut engine, item, &[EventKind::PointerDown]);
        engine.handle_pointer(PointerInput::Down { x: 45.0, y: 45.0 }, PointerSource::Touch);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_handlers_of_disposed_nodes_are_pruned() {
        let mut engine = engine();
        let (_, item) = scene_with_box(&mut engine);
        engine.on(item, EventKind::Click, |_, _| EventResponse::Ignored);
        engine.scene_mut().dispose(item);
        engine.frame();
        assert!(engine.handlers.is_empty());
    }

    #[test]
    fn test_handler_can_mutate_scene() {
        let mut engine = engine();
        let (_, item) = scene_with_box(&mut engine);
        engine.on(item, EventKind::PointerDown, move |scene, event| {
            scene.dispose(event.target);
            EventResponse::Handled
        });

        engine.handle_pointer(PointerInput::Down { x: 20.0, y: 20.0 }, PointerSource::Mouse);
        assert!(!engine.scene().contains(item));
        engine.handle_pointer(PointerInput::Up { x: 20.0, y: 20.0 }, PointerSource::Mouse);
        engine.frame();
    }

    #[test]
    fn test_animation_patches_apply_each_frame() {
        let mut engine = engine();
        let (_, item) = scene_with_box(&mut engine);
        let (sender, source) = crate::animation::animation_channel();
        engine.add_animation(source);

        sender.send("box", StylePatch::new().opacity(0.25));
        sender.send("ghost", StylePatch::new().opacity(0.25));
        engine.frame();
        assert_eq!(engine.scene().get(item).unwrap().style().opacity, 0.25);
    }
}
