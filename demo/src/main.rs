use std::path::Path;

use flipview::{Demo, VulkanBase, VulkanRenderer};

mod config;
mod ui;

use config::{DemoConfig, CONFIG_PATH};

struct Application {
    demo: Demo<VulkanRenderer>,
    ui: ui::Ui,
    fps_timer: flipview::FpsTimer,
    base: VulkanBase,
}

impl Application {
    fn new(config: &DemoConfig) -> flipview::Result<Application> {
        puffin::profile_function!();

        let base = VulkanBase::new(&config.window_desc())?;
        let extent = base.surface_resolution;

        let renderer = VulkanRenderer::new(
            base.device.clone(),
            &base.present_image_views,
            base.surface_format,
            extent,
            config.renderer_paths(),
        )?;

        let mut demo = Demo::new(renderer, config.settings);
        demo.load_assets()?;
        demo.prepare()?;

        let ui = ui::Ui::new(
            extent.width,
            extent.height,
            &base.device,
            &base.swapchain_loader,
            base.swapchain,
            base.surface_format,
        );

        Ok(Application {
            demo,
            ui,
            fps_timer: flipview::FpsTimer::new(),
            base,
        })
    }

    fn run(&mut self) -> flipview::Result<()> {
        self.base.run(|events| {
            puffin::profile_scope!("main_run");

            self.ui.handle_events(events, self.base.window.id());
            self.ui.begin_frame();

            let fps = self.fps_timer.calculate();
            let mut settings = *self.demo.settings();
            ui::update_ui(
                &self.ui.context(),
                &mut settings,
                self.demo.framebuffer_extent(),
                fps,
                self.fps_timer.frame_time_ms(),
            );

            if let Some(change) = self.demo.apply_settings(settings)? {
                log::info!("{:?} change: {:?}", change, self.demo.settings());
            }

            let present_index = self.base.prepare_frame()?;

            let demo = &mut self.demo;
            let ui = &mut self.ui;
            let window = &self.base.window;
            self.base.record_commands(|_, command_buffer| {
                demo.render((command_buffer, present_index as usize))?;

                // This also does the transition of the swapchain image to PRESENT_SRC_KHR
                ui.end_frame(command_buffer, present_index, window);
                Ok(())
            })?;

            self.base.submit_commands()?;
            self.base.present_frame(present_index)
        })
    }
}

fn log_error_chain(err: &dyn std::error::Error) {
    log::error!("{}", err);

    let mut source = err.source();
    while let Some(cause) = source {
        log::error!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn main() {
    let config = DemoConfig::load(Path::new(CONFIG_PATH));
    let level = config
        .as_ref()
        .ok()
        .and_then(|config| config.log_level_filter().ok())
        .unwrap_or(log::LevelFilter::Info);

    if let Err(err) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to install the logger: {}", err);
    }

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            log_error_chain(&err);
            std::process::exit(1);
        }
    };

    puffin::set_scopes_on(true);

    log::info!("Starting \"{}\"", config.title);

    let result = Application::new(&config).and_then(|mut app| app.run());
    if let Err(err) = result {
        log_error_chain(&err);
        std::process::exit(1);
    }
}
