use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use super::*;
use crate::assets::loader::MemoryImageLoader;
use crate::foundation::core::{ColorCode, Rgb, Vec2};

type Calls = Rc<RefCell<Vec<&'static str>>>;

struct MockSurface {
    tag: &'static str,
    calls: Calls,
}

impl Surface for MockSurface {
    fn configure(&mut self, _viewport: &Viewport) {
        self.calls.borrow_mut().push(if self.tag == "main" {
            "main.configure"
        } else {
            "mm.configure"
        });
    }

    fn clear(&mut self) {
        self.calls.borrow_mut().push(if self.tag == "main" {
            "main.clear"
        } else {
            "mm.clear"
        });
    }

    fn draw_bitmap(&mut self, _bitmap: &Bitmap, _dst_w: f64, _dst_h: f64) {
        self.calls.borrow_mut().push(if self.tag == "main" {
            "main.draw"
        } else {
            "mm.draw"
        });
    }
}

fn png(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn engine() -> (Engine, Calls) {
    let loader = MemoryImageLoader::new()
        .with("white.png", png(2, 2, [255, 255, 255]))
        .with("red.png", png(2, 2, [255, 0, 0]));
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let opts = EngineOpts {
        compositor: CompositorMode::Inline,
        ..EngineOpts::default()
    };
    let e = Engine::new(
        opts,
        Box::new(MockSurface {
            tag: "main",
            calls: Rc::clone(&calls),
        }),
        Box::new(MockSurface {
            tag: "mm",
            calls: Rc::clone(&calls),
        }),
        Arc::new(loader),
    )
    .unwrap();
    (e, calls)
}

const INIT: &str = "initMapSnapshot,0,0,1,64,48,2,2,ffffff,ff0000,0000ff,white.png";

/// Engine in `Live` with a started frame loop whose baseline is t=0.
fn live_engine() -> (Engine, Calls) {
    let (mut e, calls) = engine();
    e.dispatch_line(INIT).unwrap();
    e.settle().unwrap();
    e.dispatch_line("initLatestColors").unwrap();
    e.frame(0.0).unwrap();
    e.drain_acks();
    calls.borrow_mut().clear();
    (e, calls)
}

#[test]
fn snapshot_then_latest_colors_inits_the_map() {
    let (mut e, _calls) = engine();
    e.dispatch_line("initMapSnapshot,0,0,1,64,48,2,2,ffffff,ff0000,white.png")
        .unwrap();
    assert_eq!(e.state(), EngineState::Initializing);
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::InitedMapSnapshot]);

    e.dispatch_line("initLatestColors,0,1").unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::Inited]);
    assert_eq!(e.state(), EngineState::Live);
    assert_eq!(e.live_pixels().unwrap().pixel(0), Some(Rgb(0xFF0000)));
    assert_eq!(e.live_pixels().unwrap().pixel(1), Some(Rgb::WHITE));
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb(0xFF0000)));
}

#[test]
fn commands_before_the_snapshot_are_state_errors() {
    let (mut e, _calls) = engine();
    assert!(matches!(
        e.dispatch_line("update,0,1").unwrap_err(),
        PixelwallError::State(_)
    ));
    e.dispatch_line(INIT).unwrap();
    // image not collected yet
    assert!(matches!(
        e.dispatch_line("initLatestColors,0,1").unwrap_err(),
        PixelwallError::State(_)
    ));
    assert!(e.dispatch_line("pbStart").is_err());
}

#[test]
fn init_applies_viewport_immediately() {
    let (mut e, calls) = engine();
    e.dispatch_line("initMapSnapshot,3,4,5,640,480,2,2,ffffff,ff0000,white.png")
        .unwrap();
    let vp = *e.viewport();
    assert_eq!((vp.width, vp.height, vp.scale), (640, 480, 5.0));
    assert_eq!(vp.translate, Vec2::new(3.0, 4.0));
    assert!(calls.borrow().contains(&"main.configure"));
}

#[test]
fn trans_with_only_translation_keeps_scale_and_size() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("trans,0,0,6,320,200").unwrap();
    e.dispatch_line("trans,-7,9").unwrap();
    let vp = *e.viewport();
    assert_eq!((vp.width, vp.height, vp.scale), (320, 200, 6.0));
    assert_eq!(vp.translate, Vec2::new(-7.0, 9.0));
    assert!(!vp.smoothing);
}

#[test]
fn redraw_only_frames_never_composite() {
    let (mut e, calls) = live_engine();
    let regens = e.regenerations();

    e.dispatch_line("trans,1,1").unwrap();
    assert!(e.needs_redraw());
    e.frame(1.0).unwrap();
    assert!(!e.needs_redraw());
    assert_eq!(e.regenerations(), regens);
    assert_eq!(
        calls.borrow().as_slice(),
        &["main.configure", "main.clear", "main.draw", "mm.draw"]
    );
}

#[test]
fn live_updates_regen_at_the_idle_interval() {
    let (mut e, _calls) = live_engine();
    let regens = e.regenerations();
    e.dispatch_line("update,3,2").unwrap();
    assert!(e.needs_regen());

    e.frame(500.0).unwrap();
    assert_eq!(e.regenerations(), regens);
    e.frame(1000.0).unwrap();
    assert_eq!(e.regenerations(), regens + 1);
    assert!(!e.needs_regen());
    assert_eq!(e.bitmap().unwrap().pixel(1, 1), Some(Rgb(0x0000FF)));
    // no ticks outside playback
    assert!(e.drain_acks().is_empty());
}

#[test]
fn protocol_violations_surface_and_leave_state() {
    let (mut e, _calls) = live_engine();
    let before = e.live_pixels().unwrap().clone();
    assert!(matches!(
        e.dispatch_line("update,0,1,4,1").unwrap_err(),
        PixelwallError::Protocol(_)
    ));
    assert_eq!(e.live_pixels().unwrap(), &before);
    assert!(!e.needs_regen());
}

#[test]
fn unknown_commands_are_ignored() {
    let (mut e, calls) = live_engine();
    e.dispatch_line("selectCell,1,1").unwrap();
    assert!(e.drain_acks().is_empty());
    assert!(calls.borrow().is_empty());
}

#[test]
fn redrawmm_blits_only_the_minimap() {
    let (mut fresh, fresh_calls) = engine();
    fresh.dispatch_line("redrawmm").unwrap();
    assert!(!fresh_calls.borrow().contains(&"mm.draw"));

    let (mut e, calls) = live_engine();
    e.dispatch_line("redrawmm").unwrap();
    assert_eq!(calls.borrow().as_slice(), &["mm.draw"]);
}

#[test]
fn playback_session_round_trip() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("pbInit,red.png").unwrap();
    assert_eq!(e.state(), EngineState::PlaybackInit);
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::PbInited]);

    e.dispatch_line("pbStart").unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::PbStarted]);
    assert_eq!(e.state(), EngineState::Playback);
    assert_eq!(e.regen_speed(), RegenSpeed::X1);
    assert_eq!(e.regen_interval_ms(), 125.0);
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb(0xFF0000)));

    let origin = e.playback_pixels().unwrap().clone();
    e.dispatch_line("pbForward,0,2,1,0").unwrap();
    e.frame(100.0).unwrap();
    assert!(e.drain_acks().is_empty());
    e.frame(125.0).unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::Tick]);
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb(0x0000FF)));

    e.dispatch_line("pbRewind,0,2,1,0").unwrap();
    assert_eq!(e.playback_pixels().unwrap(), &origin);
    e.frame(250.0).unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::Tick]);

    e.dispatch_line("pbPlayAgain").unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::Tick]);

    e.dispatch_line("pbEnd").unwrap();
    assert_eq!(e.state(), EngineState::Live);
    assert_eq!(e.regen_speed(), RegenSpeed::Idle);
    assert!(e.playback_pixels().is_none());
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb::WHITE));
    assert!(e.drain_acks().is_empty());
}

#[test]
fn live_updates_during_playback_wait_for_pb_end() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("pbInit").unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::PbInited]);
    e.dispatch_line("pbStart").unwrap();
    e.drain_acks();

    e.dispatch_line("update,2,1").unwrap();
    assert!(!e.needs_regen());
    assert_eq!(e.live_pixels().unwrap().pixel(2), Some(Rgb(0xFF0000)));

    e.dispatch_line("pbEnd").unwrap();
    assert_eq!(e.bitmap().unwrap().pixel(0, 1), Some(Rgb(0xFF0000)));
}

#[test]
fn speed_selected_before_start_is_kept() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("pbSpeed,4").unwrap();
    e.dispatch_line("pbInit").unwrap();
    e.dispatch_line("pbStart").unwrap();
    assert_eq!(e.regen_speed(), RegenSpeed::X4);

    e.dispatch_line("pbSpeed,3").unwrap();
    assert_eq!(e.regen_speed(), RegenSpeed::X4);
    e.dispatch_line("pbSpeed,2").unwrap();
    assert_eq!(e.regen_interval_ms(), 62.5);
}

#[test]
fn playback_steps_require_playback_state() {
    let (mut e, _calls) = live_engine();
    assert!(e.dispatch_line("pbForward,0,1").is_err());
    assert!(e.dispatch_line("pbRewind,0,1").is_err());
    assert!(e.dispatch_line("pbPlayAgain").is_err());
    assert!(e.dispatch_line("pbEnd").is_err());
}

#[test]
fn reverse_reports_replaced_codes_without_touching_display() {
    let (mut e, calls) = live_engine();
    assert!(e.dispatch_line("reverse,0,1").is_err());

    e.dispatch_line("pbInit,red.png").unwrap();
    e.settle().unwrap();
    e.drain_acks();
    calls.borrow_mut().clear();

    e.dispatch_line("reverse,0,2,0,0,3,2").unwrap();
    assert_eq!(
        e.drain_acks(),
        vec![Ack::Reverse(vec![ColorCode(1), ColorCode(2), ColorCode(1)])]
    );
    assert!(calls.borrow().is_empty());
    assert!(!e.needs_regen());
}

#[test]
fn cancelled_snapshot_never_acks() {
    let (mut e, _calls) = engine();
    e.dispatch_line(INIT).unwrap();
    e.cancel_pending();
    e.settle().unwrap();
    assert!(e.drain_acks().is_empty());
    assert!(e.live_pixels().is_none());
}

#[test]
fn missing_image_is_reported_and_never_acked() {
    let (mut e, _calls) = engine();
    e.dispatch_line("initMapSnapshot,0,0,1,64,48,2,2,ffffff,ff0000,nope.png")
        .unwrap();
    assert!(matches!(e.settle().unwrap_err(), PixelwallError::Asset(_)));
    assert!(e.drain_acks().is_empty());
}

#[test]
fn shutdown_stops_the_frame_loop() {
    let (mut e, calls) = live_engine();
    e.shutdown();
    e.dispatch_line("trans,1,1").unwrap();
    e.frame(5000.0).unwrap();
    assert!(!calls.borrow().contains(&"main.draw"));
}

#[test]
fn worker_compositor_delivers_on_later_frames() {
    let loader = MemoryImageLoader::new().with("white.png", png(2, 2, [255, 255, 255]));
    let opts = EngineOpts {
        compositor: CompositorMode::Worker,
        ..EngineOpts::default()
    };
    let mut e = Engine::new(
        opts,
        Box::new(crate::render::surface::RasterSurface::default()),
        Box::new(crate::render::surface::RasterSurface::default()),
        Arc::new(loader),
    )
    .unwrap();
    e.dispatch_line(INIT).unwrap();
    e.settle().unwrap();
    e.dispatch_line("initLatestColors,3,1").unwrap();
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::InitedMapSnapshot, Ack::Inited]);
    assert_eq!(e.bitmap().unwrap().pixel(1, 1), Some(Rgb(0xFF0000)));

    e.frame(0.0).unwrap();
    e.dispatch_line("update,0,2").unwrap();
    e.frame(1000.0).unwrap();
    // updates after submission re-arm the flag instead of being lost
    e.dispatch_line("update,1,2").unwrap();
    assert!(e.needs_regen());
    e.settle().unwrap();
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb(0x0000FF)));
    e.shutdown();
}

/// Leaves a scheduled regen submitted but not yet collected, as a busy worker would.
fn hold_scheduled_regen(e: &mut Engine) {
    e.submit_regen(e.scheduled_regen()).unwrap();
    assert!(e.compositor.is_busy());
}

#[test]
fn live_regen_finishing_after_pb_start_does_not_tick() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("update,0,1").unwrap();
    hold_scheduled_regen(&mut e);

    e.dispatch_line("pbInit").unwrap();
    e.dispatch_line("pbStart").unwrap();
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::PbInited, Ack::PbStarted]);
    assert!(!e.needs_regen());
}

#[test]
fn play_again_over_an_in_flight_regen_ticks_once() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("pbInit").unwrap();
    e.dispatch_line("pbStart").unwrap();
    e.dispatch_line("pbForward,0,1").unwrap();
    e.drain_acks();
    hold_scheduled_regen(&mut e);

    e.dispatch_line("pbPlayAgain").unwrap();
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::Tick]);
    assert_eq!(e.bitmap().unwrap().pixel(0, 0), Some(Rgb::WHITE));
}

#[test]
fn playback_regen_finishing_after_pb_end_does_not_tick() {
    let (mut e, _calls) = live_engine();
    e.dispatch_line("pbInit").unwrap();
    e.dispatch_line("pbStart").unwrap();
    e.dispatch_line("pbForward,0,1").unwrap();
    e.drain_acks();
    hold_scheduled_regen(&mut e);

    e.dispatch_line("pbEnd").unwrap();
    e.settle().unwrap();
    assert!(e.drain_acks().is_empty());
    assert_eq!(e.state(), EngineState::Live);
}

#[test]
fn worker_acks_stay_ordered_across_pb_start() {
    let loader = MemoryImageLoader::new().with("big.png", png(1500, 1500, [255, 255, 255]));
    let opts = EngineOpts {
        compositor: CompositorMode::Worker,
        ..EngineOpts::default()
    };
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let mut e = Engine::new(
        opts,
        Box::new(MockSurface {
            tag: "main",
            calls: Rc::clone(&calls),
        }),
        Box::new(MockSurface {
            tag: "mm",
            calls: Rc::clone(&calls),
        }),
        Arc::new(loader),
    )
    .unwrap();
    e.dispatch_line("initMapSnapshot,0,0,1,64,48,1500,1500,ffffff,ff0000,big.png")
        .unwrap();
    e.settle().unwrap();
    e.dispatch_line("initLatestColors").unwrap();
    e.settle().unwrap();
    e.frame(0.0).unwrap();
    e.drain_acks();

    // the live regen is usually still on the worker when pbStart arrives
    e.dispatch_line("update,0,1").unwrap();
    e.frame(1000.0).unwrap();
    e.dispatch_line("pbInit,").unwrap();
    e.dispatch_line("pbStart").unwrap();
    e.settle().unwrap();
    assert_eq!(e.drain_acks(), vec![Ack::PbInited, Ack::PbStarted]);
    e.shutdown();
}
