// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use trigon_core::init_tracing;
use trigon_platform::PlatformWindow;
use trigon_render::{run, ShaderBlob};
use trigon_render_vk::{triangle_shaders, ContextDesc, DevicePreference, EngineDesc, VkRenderer};

mod config;

use config::{load_cfg, RenderCfg};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML)
    #[arg(long, default_value = "trigon.toml")]
    config: PathBuf,
    /// Validation layers; defaults to on in debug builds
    #[arg(long, value_enum)]
    validation: Option<Toggle>,
    /// Pick a CPU (software) Vulkan device
    #[arg(long)]
    software: bool,
    /// Stop after N drawn frames; 0 runs until the window closes
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn load_shaders(cfg: &RenderCfg) -> Result<(ShaderBlob, ShaderBlob)> {
    let (mut vert, mut frag) = triangle_shaders();
    if let Some(path) = &cfg.vertex_shader {
        vert = ShaderBlob::from_file(path)
            .with_context(|| format!("vertex shader {}", path.display()))?;
    }
    if let Some(path) = &cfg.fragment_shader {
        frag = ShaderBlob::from_file(path)
            .with_context(|| format!("fragment shader {}", path.display()))?;
    }
    Ok((vert, frag))
}

fn engine_desc(args: &Args, cfg: &RenderCfg) -> EngineDesc {
    let validation = args
        .validation
        .map(|t| t == Toggle::On)
        .or(cfg.validation)
        .unwrap_or(cfg!(debug_assertions));
    let preference = if args.software {
        DevicePreference::Software
    } else {
        DevicePreference::from_build()
    };
    EngineDesc {
        context: ContextDesc::new(validation, preference),
        present: cfg.present_mode.into(),
        clear_color: cfg.clear_color,
    }
}

fn run_app(args: &Args) -> Result<()> {
    let cfg = load_cfg(&args.config);
    let desc = engine_desc(args, &cfg.render);
    info!(
        validation = desc.context.validation(),
        preference = ?desc.context.device_preference,
        present = ?desc.present,
        "renderer config"
    );
    let (vert, frag) = load_shaders(&cfg.render)?;

    let mut window = PlatformWindow::open(&(&cfg.window).into())?;
    // declared after the window so it is dropped first
    let mut engine =
        VkRenderer::with_vulkan(&mut window, &desc, &vert, &frag).context("vulkan init")?;

    let max_frames = (args.frames > 0).then_some(args.frames);
    let stats = run(&mut engine, &mut window, max_frames)?;
    info!(
        drawn = stats.drawn,
        skipped = stats.skipped,
        recreated = stats.recreated,
        "exiting"
    );
    engine.shutdown().context("shutdown")?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run_app(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
