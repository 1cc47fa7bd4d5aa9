use std::cell::RefCell;
use std::rc::Rc;

use ash::vk;
use flipview::{
    CullMode, Demo, DemoSettings, Error, FramePlan, FrontFace, PipelineBuildError,
    RasterizationState, RenderBackend, SettingsChange,
};

#[derive(Clone, Debug, PartialEq)]
enum Event {
    LoadAssets,
    UpdateVertices(f32),
    SetupDescriptors,
    CreatePipeline(u32, RasterizationState),
    DestroyPipeline(u32),
    WaitIdle,
    Record(u32),
    Execute,
}

#[derive(Default)]
struct RecordingBackend {
    events: Rc<RefCell<Vec<Event>>>,
    plans: Rc<RefCell<Vec<FramePlan>>>,
    next_id: u32,
    fail_create: bool,
}

impl RecordingBackend {
    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl RenderBackend for RecordingBackend {
    type Pipeline = u32;
    type Target = ();

    fn framebuffer_extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: 1280,
            height: 720,
        }
    }

    fn load_assets(&mut self, _aspect: f32) -> flipview::Result<()> {
        self.push(Event::LoadAssets);
        Ok(())
    }

    fn update_vertices(&mut self, aspect: f32) -> flipview::Result<()> {
        self.push(Event::UpdateVertices(aspect));
        Ok(())
    }

    fn setup_descriptors(&mut self) -> flipview::Result<()> {
        self.push(Event::SetupDescriptors);
        Ok(())
    }

    fn create_pipeline(&mut self, state: &RasterizationState) -> flipview::Result<u32> {
        if self.fail_create {
            return Err(PipelineBuildError::Rejected(vk::Result::ERROR_OUT_OF_HOST_MEMORY).into());
        }

        self.next_id += 1;
        self.push(Event::CreatePipeline(self.next_id, *state));
        Ok(self.next_id)
    }

    fn destroy_pipeline(&mut self, pipeline: u32) {
        self.push(Event::DestroyPipeline(pipeline));
    }

    fn wait_idle(&self) -> flipview::Result<()> {
        self.push(Event::WaitIdle);
        Ok(())
    }

    fn record(&mut self, pipeline: &u32, plan: &FramePlan) -> flipview::Result<()> {
        self.push(Event::Record(*pipeline));
        self.plans.borrow_mut().push(plan.clone());
        Ok(())
    }

    fn execute(&mut self, _target: ()) -> flipview::Result<()> {
        self.push(Event::Execute);
        Ok(())
    }
}

struct Harness {
    demo: Demo<RecordingBackend>,
    events: Rc<RefCell<Vec<Event>>>,
    plans: Rc<RefCell<Vec<FramePlan>>>,
}

impl Harness {
    fn new() -> Self {
        let backend = RecordingBackend::default();
        let events = backend.events.clone();
        let plans = backend.plans.clone();

        Harness {
            demo: Demo::new(backend, DemoSettings::default()),
            events,
            plans,
        }
    }

    fn prepared() -> Self {
        let mut harness = Harness::new();
        harness.demo.prepare().unwrap();
        harness.events.borrow_mut().clear();
        harness
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| wanted(event)).count()
    }
}

#[test]
fn render_is_a_noop_before_prepare() {
    let mut harness = Harness::new();

    assert!(!harness.demo.render(()).unwrap());
    assert!(harness.events().is_empty());

    harness.demo.prepare().unwrap();

    assert!(harness.demo.render(()).unwrap());
    assert_eq!(harness.events().last(), Some(&Event::Execute));
}

#[test]
fn prepare_builds_everything_once() {
    let mut harness = Harness::new();
    harness.demo.prepare().unwrap();
    harness.demo.prepare().unwrap();

    let events = harness.events();
    assert_eq!(events[0], Event::LoadAssets);
    assert_eq!(events[1], Event::SetupDescriptors);
    assert_eq!(
        events[2],
        Event::CreatePipeline(1, DemoSettings::default().rasterization_state())
    );
    assert_eq!(harness.count(|e| matches!(e, Event::Record(1))), 1);
    assert_eq!(harness.demo.pipeline(), Some(&1));
}

#[test]
fn loading_assets_twice_loads_once() {
    let mut harness = Harness::new();
    harness.demo.load_assets().unwrap();
    harness.demo.load_assets().unwrap();
    harness.demo.prepare().unwrap();

    assert_eq!(harness.count(|e| *e == Event::LoadAssets), 1);
}

#[test]
fn viewport_change_only_re_records() {
    let mut harness = Harness::prepared();

    let mut settings = *harness.demo.settings();
    settings.negative_viewport = false;
    settings.offset_y = 100;
    let change = harness.demo.apply_settings(settings).unwrap();

    assert_eq!(change, Some(SettingsChange::ViewportOnly));
    assert_eq!(harness.count(|e| matches!(e, Event::CreatePipeline(..))), 0);
    assert_eq!(harness.count(|e| matches!(e, Event::Record(1))), 1);

    let viewport = harness.demo.plan().unwrap().viewport().unwrap();
    assert!(!viewport.is_flipped());
    assert_eq!(viewport.y, 100.0);
}

#[test]
fn unchanged_settings_do_nothing() {
    let mut harness = Harness::prepared();

    let settings = *harness.demo.settings();
    let change = harness.demo.apply_settings(settings).unwrap();

    assert_eq!(change, None);
    assert!(harness.events().is_empty());
}

#[test]
fn pipeline_change_creates_before_destroying() {
    let mut harness = Harness::prepared();

    let mut settings = *harness.demo.settings();
    settings.front_face = FrontFace::Clockwise;
    settings.cull_mode = CullMode::None;
    let change = harness.demo.apply_settings(settings).unwrap();

    assert_eq!(change, Some(SettingsChange::PipelineAffecting));

    let expected_state = RasterizationState {
        front_face: FrontFace::Clockwise,
        cull_mode: CullMode::None,
    };
    let events = harness.events();
    let created = events
        .iter()
        .position(|e| *e == Event::CreatePipeline(2, expected_state))
        .unwrap();
    let waited = events.iter().position(|e| *e == Event::WaitIdle).unwrap();
    let destroyed = events
        .iter()
        .position(|e| *e == Event::DestroyPipeline(1))
        .unwrap();
    let recorded = events.iter().position(|e| *e == Event::Record(2)).unwrap();

    assert!(created < waited);
    assert!(waited < destroyed);
    assert!(destroyed < recorded);
    assert_eq!(harness.demo.pipeline(), Some(&2));
    assert_eq!(harness.demo.pipeline_generation(), 2);
}

#[test]
fn failed_rebuild_keeps_the_previous_pipeline() {
    let mut harness = Harness::prepared();
    harness.demo.backend_mut().fail_create = true;

    let mut settings = *harness.demo.settings();
    settings.cull_mode = CullMode::Front;
    let result = harness.demo.apply_settings(settings);

    assert!(matches!(result, Err(Error::PipelineBuild(_))));
    assert_eq!(harness.demo.pipeline(), Some(&1));
    assert_eq!(harness.count(|e| matches!(e, Event::DestroyPipeline(_))), 0);
    assert_eq!(harness.demo.settings().cull_mode, CullMode::Back);
    assert!(harness.demo.render(()).unwrap());
}

#[test]
fn retrying_after_a_failed_rebuild_builds_the_pipeline() {
    let mut harness = Harness::prepared();
    harness.demo.backend_mut().fail_create = true;

    let mut settings = *harness.demo.settings();
    settings.cull_mode = CullMode::Front;
    assert!(harness.demo.apply_settings(settings).is_err());

    harness.demo.backend_mut().fail_create = false;
    let change = harness.demo.apply_settings(settings).unwrap();

    assert_eq!(change, Some(SettingsChange::PipelineAffecting));
    let expected_state = RasterizationState {
        front_face: FrontFace::CounterClockwise,
        cull_mode: CullMode::Front,
    };
    assert!(harness
        .events()
        .contains(&Event::CreatePipeline(2, expected_state)));
    assert_eq!(harness.demo.pipeline(), Some(&2));
    assert_eq!(harness.demo.settings().cull_mode, CullMode::Front);
}

#[test]
fn resize_rescales_vertices_and_re_records() {
    let mut harness = Harness::prepared();

    harness
        .demo
        .resize(vk::Extent2D {
            width: 640,
            height: 480,
        })
        .unwrap();

    let events = harness.events();
    let rescaled = events
        .iter()
        .position(|e| *e == Event::UpdateVertices(0.75))
        .unwrap();
    let recorded = events.iter().position(|e| *e == Event::Record(1)).unwrap();
    assert_eq!(events[rescaled - 1], Event::WaitIdle);
    assert!(rescaled < recorded);
    assert_eq!(harness.count(|e| matches!(e, Event::Record(1))), 1);

    let viewport = harness.demo.plan().unwrap().viewport().unwrap();
    assert_eq!(viewport.width, 640.0);
    assert_eq!(viewport.height, -480.0);
    assert_eq!(viewport.y, 480.0);
}

#[test]
fn every_recorded_plan_draws_both_quads() {
    let mut harness = Harness::prepared();

    let mut settings = *harness.demo.settings();
    settings.offset_x = 42;
    harness.demo.apply_settings(settings).unwrap();
    settings.front_face = FrontFace::Clockwise;
    harness.demo.apply_settings(settings).unwrap();

    let plans = harness.plans.borrow();
    assert_eq!(plans.len(), 3);
    assert!(plans.iter().all(|plan| plan.draw_count() == 2));
}

#[test]
fn dropping_the_demo_destroys_the_pipeline() {
    let harness = Harness::prepared();
    let events = harness.events.clone();

    drop(harness);

    let events = events.borrow();
    assert_eq!(events.as_slice(), &[Event::WaitIdle, Event::DestroyPipeline(1)]);
}

#[test]
fn resize_before_loading_leaves_the_buffers_alone() {
    let mut harness = Harness::new();

    harness
        .demo
        .resize(vk::Extent2D {
            width: 640,
            height: 480,
        })
        .unwrap();

    assert!(harness.events().is_empty());
}
