//! Builds a small scene, runs a few animation frames and writes the result
//! to `scene.png` (or the path given as the first argument).
//!
//! `cargo run --example scene_png -- out.png [image.png]`

use std::time::{Duration, Instant};

use canvas2d::prelude::*;
use canvas2d::tiny_skia::PathBuilder;

fn star(radius: f32) -> Option<canvas2d::tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for i in 0..10 {
        let r = if i % 2 == 0 { radius } else { radius * 0.45 };
        let angle = (i as f32 * 36.0 - 90.0).to_radians();
        let (x, y) = (radius + r * angle.cos(), radius + r * angle.sin());
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "scene.png".to_string());
    let picture = args.next();

    let config = EngineConfig::default()
        .size(480, 320)
        .device_pixel_ratio(2.0)
        .background(Color::from_hex(0xf4f1ea))
        .frame_budget(None);
    let mut engine = Engine::new(config)?;
    let scene = engine.scene_mut();

    let root = scene.container("root");
    scene.add_root(LayerId(0), root)?;
    scene.attr(root, &StylePatch::new().left(0.0).top(0.0))?;

    let card = scene.stack("card", true);
    scene.add(root, card)?;
    scene.attr(
        card,
        &StylePatch::new()
            .left(24.0)
            .top(24.0)
            .border(2.0, Color::from_hex(0x2b2d42))
            .border_radius(12.0)
            .background(Color::WHITE)
            .clip(true),
    )?;

    let title = scene.text("title", "canvas2d", Font::new(28.0).weight(700));
    scene.add(card, title)?;
    scene.attr(title, &StylePatch::new().left(16.0).top(12.0).width(200.0))?;

    let body = scene.text(
        "body",
        "A retained scene graph painted by tiny-skia.",
        Font::new(14.0),
    );
    scene.add(card, body)?;
    scene.attr(
        body,
        &StylePatch::new()
            .left(16.0)
            .top(8.0)
            .bottom(16.0)
            .width(200.0)
            .color(Color::from_hex(0x555b6e)),
    )?;

    let tiles = scene.wrap("tiles");
    scene.add(root, tiles)?;
    scene.attr(tiles, &StylePatch::new().left(260.0).top(24.0).width(200.0))?;
    let palette = [0xef476f, 0xffd166, 0x06d6a0, 0x118ab2, 0x073b4c, 0x8338ec, 0xfb5607];
    for (i, hex) in palette.into_iter().enumerate() {
        let tile = scene.div(&format!("tile-{i}"));
        scene.add(tiles, tile)?;
        scene.attr(
            tile,
            &StylePatch::new()
                .size(40.0 + (i % 3) as f32 * 10.0, 40.0)
                .left(6.0)
                .top(6.0)
                .border_radius(6.0)
                .background(Color::from_hex(hex))
                .cached(true),
        )?;
    }

    if let Some(path) = star(40.0) {
        let badge = scene.path("badge", path);
        scene.add(root, badge)?;
        scene.attr(
            badge,
            &StylePatch::new()
                .left(60.0)
                .top(200.0)
                .background(Color::from_hex(0xffd166))
                .border(2.0, Color::from_hex(0x2b2d42)),
        )?;
    }

    if let Some(src) = picture.as_deref() {
        let photo = scene.image("photo", src);
        scene.add(root, photo)?;
        scene.attr(photo, &StylePatch::new().right(24.0).bottom(24.0).height(96.0))?;
    }

    engine.add_animation(
        Tween::new("badge", StyleProp::Rotation, 0.0, 36.0, Duration::from_millis(400))
            .timing(TimingFunction::EaseInOut),
    );

    // Step a simulated clock so the output does not depend on wall time
    let start = Instant::now();
    for frame in 0..=30 {
        engine.frame_at(start + Duration::from_millis(frame * 16));
    }
    // Images decode on a worker thread
    while engine.frame() {
        std::thread::sleep(Duration::from_millis(5));
    }

    engine.save_png(&output)?;
    log::info!("wrote {output}");
    Ok(())
}
