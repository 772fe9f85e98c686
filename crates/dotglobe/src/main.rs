//! Entry point for the globe viewer.

use anyhow::{Context, Result};
use clap::Parser;
use dotglobe::{app::App, config::Document};
use hgt::Heightmap;
use std::{fs, path::PathBuf, sync::Arc};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "dotglobe", version)]
struct Args {
    /// Scene file: `{ "globe": {..}, "children": [..] }`. Image urls in it
    /// resolve against its directory.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Heightmap (.hgt). Without one every cell counts as land.
    #[arg(long)]
    heightmap: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn load_scene(path: Option<&PathBuf>) -> Result<(Document, Option<PathBuf>)> {
    let Some(path) = path else {
        return Ok((Document::default(), None));
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading scene {}", path.display()))?;
    let document = Document::from_json(&json)
        .with_context(|| format!("parsing scene {}", path.display()))?;
    log::info!(
        "scene {}: {} child elements",
        path.display(),
        document.children().len()
    );
    Ok((document, path.parent().map(PathBuf::from)))
}

fn load_heightmap(path: Option<&PathBuf>) -> Result<Heightmap> {
    match path {
        Some(path) => {
            let map = hgt::read_file(path)
                .with_context(|| format!("reading heightmap {}", path.display()))?;
            log::info!("heightmap {}: {}x{}", path.display(), map.width, map.height);
            Ok(map)
        }
        None => Ok(Heightmap::filled(2, 1, 1.0)),
    }
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (document, base_dir) = load_scene(args.scene.as_ref())?;
    let heightmap = load_heightmap(args.heightmap.as_ref())?;

    // Create the event loop and window.
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("dotglobe")
            .with_inner_size(winit::dpi::LogicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    // Initialise the application (async → sync).
    let mut app = pollster::block_on(App::new(window.clone(), document, heightmap, base_dir))?;

    // Run the winit event loop.
    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                // Forward events to the app; handle unconsumed window events.
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => {
                            app.globe.dispose();
                            elwt.exit();
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                app.globe.dispose();
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory – exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                // Request a redraw each frame.
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
