//! End-to-end keyframe animation lifecycle through the controller.

mod common;

use common::*;
use fastmotion::{AnimationEventKind, AnimationPlayState, FillMode, TargetId, TimerSchedule};
use fastmotion::ManualClock;
use std::sync::Arc;

#[test]
fn two_iteration_animation_fires_start_iteration_end() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  let mut descriptor = linear_keyframes_descriptor("grow", 1.0);
  descriptor.iteration_count = 2.0;
  declared.animations = vec![Arc::new(descriptor)];

  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  let events = ctrl.take_events();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, AnimationEventKind::AnimationStart);
  assert_eq!(events[0].name, "grow");
  assert_eq!(events[0].elapsed_time, 0.0);

  clock.advance(0.5);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 50.0);

  // Crossing the loop boundary yields one iteration event.
  clock.advance(0.75);
  ctrl.animation_timer_fired();
  let events = ctrl.take_events();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, AnimationEventKind::AnimationIteration);
  assert!((events[0].elapsed_time - 1.0).abs() < 1e-9);
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 25.0);

  clock.advance(1.0);
  ctrl.animation_timer_fired();
  let events = ctrl.take_events();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, AnimationEventKind::AnimationEnd);
  assert!((events[0].elapsed_time - 2.0).abs() < 1e-9);

  // No fill: the declared value shows through after the end.
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 0.0);
  assert_eq!(ctrl.number_of_active_animations(), 0);
}

#[test]
fn fill_forwards_retains_the_final_frame() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  let mut descriptor = linear_keyframes_descriptor("grow", 1.0);
  descriptor.fill_mode = FillMode::Forwards;
  declared.animations = vec![Arc::new(descriptor)];

  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();

  clock.advance(1.5);
  ctrl.animation_timer_fired();
  let events = ctrl.take_events();
  assert!(events
    .iter()
    .any(|e| e.kind == AnimationEventKind::AnimationEnd));

  // Long after the end the final frame still wins.
  clock.advance(10.0);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 100.0);
  // Filling needs no servicing.
  assert_eq!(ctrl.timer_schedule(), TimerSchedule::Inactive);
}

#[test]
fn fill_backwards_applies_the_first_frame_during_the_delay() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(50.0);
  let mut declared = width_style(50.0);
  let mut descriptor = linear_keyframes_descriptor("grow", 1.0);
  descriptor.delay = 0.5;
  descriptor.fill_mode = FillMode::Backwards;
  declared.animations = vec![Arc::new(descriptor)];

  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 0.0);
  match ctrl.timer_schedule() {
    TimerSchedule::OneShot(t) => assert!((t - 0.5).abs() < 1e-9),
    other => panic!("expected one-shot, got {other:?}"),
  }

  clock.advance(0.5);
  ctrl.animation_timer_fired();
  assert!(ctrl.take_dirty_targets().contains(&target));
  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();

  clock.advance(0.25);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 25.0);
}

#[test]
fn unknown_keyframes_name_is_inert() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  declared.animations = vec![Arc::new(linear_keyframes_descriptor("missing", 1.0))];

  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 0.0);
  assert_eq!(ctrl.number_of_active_animations(), 0);
  assert_eq!(ctrl.timer_schedule(), TimerSchedule::Inactive);
  assert!(ctrl.take_events().is_empty());
}

#[test]
fn declared_play_state_paused_parks_until_set_running() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(0.0);
  let mut paused_decl = width_style(0.0);
  let mut descriptor = linear_keyframes_descriptor("grow", 1.0);
  descriptor.play_state = AnimationPlayState::Paused;
  paused_decl.animations = vec![Arc::new(descriptor.clone())];

  let blended = ctrl.update(target, &base, &paused_decl);
  ctrl.end_animation_update();
  assert_width(&blended, 0.0);
  assert_eq!(ctrl.number_of_active_animations(), 0);

  // Flip the declaration to running a second later; the run starts now,
  // not retroactively.
  clock.advance(1.0);
  let mut running_decl = width_style(0.0);
  descriptor.play_state = AnimationPlayState::Running;
  running_decl.animations = vec![Arc::new(descriptor)];
  ctrl.update(target, &base, &running_decl);
  ctrl.end_animation_update();

  clock.advance(0.5);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &running_decl);
  ctrl.end_animation_update();
  assert_width(&blended, 50.0);
}

#[test]
fn changing_the_declared_timing_restarts_the_animation() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  declared.animations = vec![Arc::new(linear_keyframes_descriptor("grow", 1.0))];

  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_eq!(ctrl.take_events().len(), 1);

  clock.advance(0.5);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 50.0);

  // Same name, new duration: the run starts over from this pass, it
  // does not continue half-done under the new timing.
  let mut redeclared = width_style(0.0);
  redeclared.animations = vec![Arc::new(linear_keyframes_descriptor("grow", 2.0))];
  ctrl.update(target, &base, &redeclared);
  ctrl.end_animation_update();
  let events = ctrl.take_events();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind, AnimationEventKind::AnimationStart);

  clock.advance(1.0);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &redeclared);
  ctrl.end_animation_update();
  assert_width(&blended, 50.0);
  // The replaced run was restarted, not finished: no end event for it.
  assert!(ctrl.take_events().is_empty());
}

#[test]
fn later_declared_animation_wins_shared_properties() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("a", 0.0, 100.0));
  ctrl.register_keyframes(width_keyframes("b", 200.0, 300.0));

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  declared.animations = vec![
    Arc::new(linear_keyframes_descriptor("a", 1.0)),
    Arc::new(linear_keyframes_descriptor("b", 1.0)),
  ];

  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();

  clock.advance(0.5);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 250.0);
}

#[test]
fn freeze_hook_pins_the_animation() {
  let clock = ManualClock::new();
  let mut ctrl = software_controller(&clock);
  let target = TargetId(1);
  ctrl.register_keyframes(width_keyframes("grow", 0.0, 100.0));

  let base = width_style(0.0);
  let mut declared = width_style(0.0);
  declared.animations = vec![Arc::new(linear_keyframes_descriptor("grow", 1.0))];

  ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  ctrl.pause_animation_at_time(target, "grow", 0.75).unwrap();

  clock.advance(30.0);
  ctrl.animation_timer_fired();
  let blended = ctrl.update(target, &base, &declared);
  ctrl.end_animation_update();
  assert_width(&blended, 75.0);
  assert_eq!(ctrl.timer_schedule(), TimerSchedule::Inactive);

  assert!(ctrl.pause_animation_at_time(target, "nope", 0.1).is_err());
}
