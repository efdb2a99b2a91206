// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use presentkit_core::init_tracing;
use presentkit_render::{ChainRequest, DeviceStrategy, Presenter, RenderSize};
use presentkit_vk::VkPresenter;
use tracing::{error, info, warn};

use presentkit_platform::nonzero_size;
use presentkit_platform::winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    raw_window_handle::{HasDisplayHandle, HasWindowHandle},
    window::{Window, WindowId},
};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with the extensions and layers to request
    #[arg(long, default_value = "presentkit.toml")]
    config: PathBuf,
    /// Override the device selection strategy from the config file
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    #[arg(long, default_value_t = 800)]
    width: u32,
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Exit as soon as the chain has been built
    #[arg(long)]
    once: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum StrategyArg {
    #[default]
    FirstEnumerated,
    PreferDiscrete,
}

impl From<StrategyArg> for DeviceStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::FirstEnumerated => DeviceStrategy::FirstEnumerated,
            StrategyArg::PreferDiscrete => DeviceStrategy::PreferDiscrete,
        }
    }
}

#[derive(Debug, Deserialize, Default, PartialEq)]
struct InstanceCfg {
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    layers: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct DeviceCfg {
    #[serde(default = "default_device_extensions")]
    extensions: Vec<String>,
    #[serde(default)]
    strategy: StrategyArg,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        DeviceCfg {
            extensions: default_device_extensions(),
            strategy: StrategyArg::default(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct AppCfg {
    #[serde(default = "default_app_name")]
    app_name: String,
    #[serde(default)]
    instance: InstanceCfg,
    #[serde(default)]
    device: DeviceCfg,
}

impl Default for AppCfg {
    fn default() -> Self {
        AppCfg {
            app_name: default_app_name(),
            instance: InstanceCfg::default(),
            device: DeviceCfg::default(),
        }
    }
}

impl AppCfg {
    fn to_request(&self, strategy: Option<StrategyArg>) -> ChainRequest {
        ChainRequest {
            app_name: self.app_name.clone(),
            instance_extensions: self.instance.extensions.clone(),
            instance_layers: self.instance.layers.clone(),
            device_extensions: self.device.extensions.clone(),
            strategy: strategy.unwrap_or(self.device.strategy).into(),
        }
    }
}

fn default_app_name() -> String {
    "presentkit".to_owned()
}
fn default_device_extensions() -> Vec<String> {
    vec!["VK_KHR_swapchain".to_owned()]
}

fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str::<AppCfg>(&s).unwrap_or_else(|e| {
            warn!("{}: {e}; using defaults", path.display());
            AppCfg::default()
        }),
        Err(_) => AppCfg::default(),
    }
}

struct App {
    request: ChainRequest,
    initial_size: RenderSize,
    once: bool,

    window: Option<Window>,
    presenter: Option<VkPresenter>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        // Chain and surface go before the window they were built on.
        self.presenter = None;
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("presentkit")
            .with_inner_size(PhysicalSize::new(
                self.initial_size.width,
                self.initial_size.height,
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => w,
            Err(e) => {
                self.failure = Some(anyhow!("create_window: {e}"));
                event_loop.exit();
                return;
            }
        };

        let (width, height) = nonzero_size(window.inner_size());
        let size = RenderSize { width, height };

        let built = match (window.window_handle(), window.display_handle()) {
            (Ok(wh), Ok(dh)) => VkPresenter::new(&wh, &dh, size, &self.request),
            (Err(e), _) | (_, Err(e)) => Err(anyhow!("window handles: {e}")),
        };

        self.window = Some(window);
        match built {
            Ok(presenter) => {
                let s = presenter.summary();
                info!(
                    "chain on {} (queue family {}): {}x{}, {}/{} images, {} {}, {}",
                    s.device_name,
                    s.queue_family,
                    s.extent.width,
                    s.extent.height,
                    s.realized_images,
                    s.requested_images,
                    s.format,
                    s.color_space,
                    s.present_mode
                );
                self.presenter = Some(presenter);
                if self.once {
                    self.shutdown(event_loop);
                    return;
                }
            }
            Err(e) => {
                error!("chain negotiation failed: {e:#}");
                self.failure = Some(e);
                self.shutdown(event_loop);
                return;
            }
        }

        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                // The chain is built once; recreation belongs to a presentation loop.
                info!(
                    "Resized → {}x{} (chain left as built)",
                    new_size.width, new_size.height
                );
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);
    let request = cfg.to_request(args.strategy);
    info!(?request, "chain request");

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App {
        request,
        initial_size: RenderSize {
            width: args.width.max(1),
            height: args.height.max(1),
        },
        once: args.once,
        window: None,
        presenter: None,
        failure: None,
    };

    event_loop.run_app(&mut app)?;
    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: AppCfg = toml::from_str("").unwrap();
        assert_eq!(cfg, AppCfg::default());
        assert_eq!(cfg.device.extensions, ["VK_KHR_swapchain"]);
    }

    #[test]
    fn full_file_parses() {
        let cfg: AppCfg = toml::from_str(
            r#"
            app_name = "demo"

            [instance]
            extensions = ["VK_EXT_debug_utils"]
            layers = ["VK_LAYER_KHRONOS_validation"]

            [device]
            extensions = ["VK_KHR_swapchain"]
            strategy = "prefer_discrete"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.app_name, "demo");
        assert_eq!(cfg.instance.layers, ["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(cfg.device.strategy, StrategyArg::PreferDiscrete);
    }

    #[test]
    fn cli_strategy_overrides_file() {
        let cfg = AppCfg::default();
        let req = cfg.to_request(Some(StrategyArg::PreferDiscrete));
        assert_eq!(req.strategy, DeviceStrategy::PreferDiscrete);
        assert_eq!(cfg.to_request(None).strategy, DeviceStrategy::FirstEnumerated);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_cfg(Path::new("/nonexistent/presentkit.toml"));
        assert_eq!(cfg, AppCfg::default());
    }

    #[test]
    fn cli_parses() {
        let args = Args::try_parse_from(["presentkit", "--strategy", "prefer-discrete", "--once"])
            .unwrap();
        assert_eq!(args.strategy, Some(StrategyArg::PreferDiscrete));
        assert!(args.once);
        assert_eq!((args.width, args.height), (800, 600));
    }
}
