use ash::vk;
use std::sync::Arc;
use std::sync::Mutex;

use flipview::{CullMode, DemoSettings, FrontFace, QuadOrientation};

pub struct Ui {
    pub egui_integration:
        egui_winit_ash_integration::Integration<Arc<Mutex<gpu_allocator::vulkan::Allocator>>>,
}

impl Ui {
    pub fn new(
        width: u32,
        height: u32,
        device: &flipview::Device,
        swapchain_loader: &ash::extensions::khr::Swapchain,
        swapchain: vk::SwapchainKHR,
        surface_format: vk::SurfaceFormatKHR,
    ) -> Self {
        let egui_integration = egui_winit_ash_integration::Integration::new(
            width,
            height,
            1.0,
            egui::FontDefinitions::default(),
            egui::Style::default(),
            device.handle.clone(),
            device.gpu_allocator.clone(),
            swapchain_loader.clone(),
            swapchain,
            surface_format,
        );

        Ui { egui_integration }
    }

    pub fn handle_events(
        &mut self,
        events: &[winit::event::WindowEvent<'static>],
        window_id: winit::window::WindowId,
    ) {
        for event in events {
            self.egui_integration
                .handle_event::<()>(&winit::event::Event::WindowEvent {
                    window_id,
                    event: event.clone(),
                });
        }
    }

    pub fn begin_frame(&mut self) {
        self.egui_integration.begin_frame();
    }

    pub fn context(&self) -> egui::Context {
        self.egui_integration.context()
    }

    /// Paints the overlay into `command_buffer`. This also transitions the
    /// swapchain image to PRESENT_SRC_KHR.
    pub fn end_frame(
        &mut self,
        command_buffer: vk::CommandBuffer,
        present_index: u32,
        window: &winit::window::Window,
    ) {
        self.egui_integration
            .context()
            .set_visuals(egui::style::Visuals::dark());

        let (_, shapes) = self.egui_integration.end_frame(window);
        let clipped_meshes = self.egui_integration.context().tessellate(shapes);
        self.egui_integration
            .paint(command_buffer, present_index as usize, clipped_meshes);
    }
}

fn combo_box(ui: &mut egui::Ui, id: &str, labels: &[&str], selected: &mut usize) {
    egui::ComboBox::from_id_source(id)
        .selected_text(labels[*selected])
        .show_ui(ui, |ui| {
            for (i, label) in labels.iter().enumerate() {
                ui.selectable_value(selected, i, *label);
            }
        });
}

/// Draws the settings window and writes the user's edits into `settings`.
/// Offsets are limited to plus or minus the framebuffer size.
pub fn update_ui(
    egui_context: &egui::Context,
    settings: &mut DemoSettings,
    extent: vk::Extent2D,
    fps: u32,
    frame_time_ms: f32,
) {
    egui::Window::new("Negative viewport height")
        .resizable(false)
        .show(egui_context, |ui| {
            ui.label(format!("FPS: {} ({:.2} ms)", fps, frame_time_ms));

            egui::CollapsingHeader::new("Scene")
                .default_open(true)
                .show(ui, |ui| {
                    ui.label("Quad type");
                    let mut quad_type = settings.quad_orientation.index();
                    combo_box(ui, "quad_type", &QuadOrientation::LABELS, &mut quad_type);
                    settings.quad_orientation = QuadOrientation::from_index(quad_type);
                });

            egui::CollapsingHeader::new("Viewport")
                .default_open(true)
                .show(ui, |ui| {
                    ui.checkbox(&mut settings.negative_viewport, "Negative viewport height");

                    let width = extent.width as i32;
                    let height = extent.height as i32;
                    ui.add(egui::Slider::new(&mut settings.offset_x, -width..=width).text("offset x"));
                    ui.add(
                        egui::Slider::new(&mut settings.offset_y, -height..=height).text("offset y"),
                    );
                });

            egui::CollapsingHeader::new("Pipeline")
                .default_open(true)
                .show(ui, |ui| {
                    ui.label("Winding order");
                    let mut winding = settings.front_face.index();
                    combo_box(ui, "winding_order", &FrontFace::LABELS, &mut winding);
                    settings.front_face = FrontFace::from_index(winding);

                    ui.label("Cull mode");
                    let mut cull = settings.cull_mode.index();
                    combo_box(ui, "cull_mode", &CullMode::LABELS, &mut cull);
                    if let Some(cull_mode) = CullMode::from_index(cull) {
                        settings.cull_mode = cull_mode;
                    }
                });
        });
}
