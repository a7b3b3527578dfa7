//! The per-instance timing state machine.
//!
//! One [`Machine`] drives one transition or keyframe animation through
//! its lifecycle: waiting out the delay, waiting for a style pass,
//! waiting for the (possibly asynchronous) start-time response, then
//! looping and ending. Kind-specific behavior (events, accelerated
//! start, override interplay) is supplied through [`InstanceCallbacks`]
//! so the machine itself stays a single concrete engine.
//!
//! Dispatch is directly re-entrant: several transitions self-deliver a
//! follow-up input from inside `update` (e.g. the synchronous
//! software-start path delivers `StartTimeSet` to itself). The
//! `pause_time` field uses a negative sentinel for "not paused"; the
//! machine asserts after every input that the sentinel agrees with the
//! paused-ness of the state.

use crate::animation::controller::ControllerShared;
use crate::animation::{AnimationDescriptor, AnimationPlayState, Direction, TargetId};
use crate::blend::PropertyId;
use crate::timing::TimingFunction;
use log::debug;
use std::sync::Arc;

/// States of the instance automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimState {
  New,
  StartWaitTimer,
  StartWaitStyleAvailable,
  StartWaitResponse,
  Looping,
  Ending,
  PausedNew,
  PausedWaitTimer,
  PausedWaitStyleAvailable,
  PausedWaitResponse,
  PausedRun,
  Done,
  FillingForwards,
}

impl AnimState {
  pub fn is_paused(self) -> bool {
    matches!(
      self,
      AnimState::PausedNew
        | AnimState::PausedWaitTimer
        | AnimState::PausedWaitStyleAvailable
        | AnimState::PausedWaitResponse
        | AnimState::PausedRun
    )
  }
}

/// Inputs of the instance automaton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationInput {
  MakeNew,
  StartAnimation,
  RestartAnimation,
  StartTimerFired,
  StyleAvailable,
  StartTimeSet(f64),
  LoopTimerFired(f64),
  EndTimerFired(f64),
  PauseOverride,
  ResumeOverride,
  PlayStateRunning,
  PlayStatePaused,
  EndAnimation,
}

/// Identity of an instance within its target's composite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceKey {
  /// A transition, keyed by the animated property.
  Transition(PropertyId),
  /// A keyframe animation, keyed by `animation-name`.
  Animation(Arc<str>),
}

/// Controller-wide identity, used by the waiting sets.
pub type InstanceHandle = (TargetId, InstanceKey);

/// A request from one instance to its sibling transitions, drained by
/// the composite after every update call. Keyframe animations use this
/// to suppress (or release) transitions on the properties they animate
/// without holding a reference to them mid-dispatch.
#[derive(Debug)]
pub struct OverrideRequest {
  pub target: TargetId,
  pub properties: Vec<PropertyId>,
  /// True to assert the override, false to release it.
  pub assert_override: bool,
}

/// Per-update-pass context handed down from the controller.
pub struct AnimationContext<'a> {
  pub target: TargetId,
  /// The frozen begin-animation-update time for this pass.
  pub now: f64,
  pub shared: &'a mut ControllerShared,
}

/// Kind-specific capabilities of an instance.
///
/// Callbacks may use the context freely, including queueing override
/// requests and talking to the compositor, but must not assume they
/// are called from any particular machine state.
pub trait InstanceCallbacks {
  fn key(&self) -> InstanceKey;

  /// Whether a higher-priority animation owns this instance's property.
  fn overridden(&self) -> bool {
    false
  }

  fn on_start(&mut self, ctx: &mut AnimationContext, elapsed: f64);
  fn on_iteration(&mut self, ctx: &mut AnimationContext, elapsed: f64);
  fn on_end(&mut self, ctx: &mut AnimationContext, elapsed: f64);

  /// Attempts accelerated execution `time_offset` seconds in. Returns
  /// true when the compositor accepted and a start-time notification
  /// will arrive later.
  fn start_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64) -> bool;
  fn pause_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64);
  fn end_accelerated(&mut self, ctx: &mut AnimationContext);

  /// Called when this instance takes ownership of its properties
  /// (keyframe animations suppress matching transitions here).
  fn override_animations(&mut self, ctx: &mut AnimationContext);
  /// Undoes `override_animations`.
  fn resume_overridden_animations(&mut self, ctx: &mut AnimationContext);
}

/// Not-paused sentinel for `pause_time`.
const NOT_PAUSED: f64 = -1.0;
/// "No boundary cached" sentinel for `next_iteration_start`.
const NO_BOUNDARY: f64 = -1.0;

/// The timing state machine for one animation instance.
pub struct Machine {
  state: AnimState,
  descriptor: Arc<AnimationDescriptor>,
  /// Time the active phase began (the delay already served), in
  /// controller-clock seconds. Backdated by a negative delay.
  start_time: Option<f64>,
  /// Time of the pause request; negative iff not paused.
  pause_time: f64,
  /// Time the start was requested; the delay counts from here.
  requested_start_time: Option<f64>,
  /// Cached `duration * iteration_count`.
  total_duration: f64,
  /// Cached elapsed time of the next loop boundary while `Looping`.
  next_iteration_start: f64,
  /// Whether the compositor currently runs this instance.
  is_accelerated: bool,
  /// The start lifecycle event fires once per run, even when a resume
  /// routes back through `StartWaitResponse`.
  start_fired: bool,
}

impl Machine {
  pub fn new(descriptor: Arc<AnimationDescriptor>) -> Machine {
    let total_duration = descriptor.total_duration();
    Machine {
      state: AnimState::New,
      descriptor,
      start_time: None,
      pause_time: NOT_PAUSED,
      requested_start_time: None,
      total_duration,
      next_iteration_start: NO_BOUNDARY,
      is_accelerated: false,
      start_fired: false,
    }
  }

  pub fn state(&self) -> AnimState {
    self.state
  }

  pub fn descriptor(&self) -> &Arc<AnimationDescriptor> {
    &self.descriptor
  }

  /// Swaps in a replacement descriptor (style recalculation produced a
  /// matching declaration). Timing caches are recomputed; the state is
  /// untouched, which is what makes this a continuation rather than a
  /// restart.
  pub fn set_descriptor(&mut self, descriptor: Arc<AnimationDescriptor>) {
    self.total_duration = descriptor.total_duration();
    self.descriptor = descriptor;
  }

  pub fn is_accelerated(&self) -> bool {
    self.is_accelerated
  }

  pub fn start_time(&self) -> Option<f64> {
    self.start_time
  }

  pub fn paused(&self) -> bool {
    self.state.is_paused()
  }

  /// Started (or starting) and not yet finished or paused.
  pub fn running(&self) -> bool {
    matches!(
      self.state,
      AnimState::StartWaitTimer
        | AnimState::StartWaitStyleAvailable
        | AnimState::StartWaitResponse
        | AnimState::Looping
        | AnimState::Ending
    )
  }

  /// Before the active phase: still waiting on timer/style/response
  /// with no start time fixed yet.
  pub fn pre_active(&self) -> bool {
    match self.state {
      AnimState::New
      | AnimState::StartWaitTimer
      | AnimState::StartWaitStyleAvailable
      | AnimState::PausedNew
      | AnimState::PausedWaitTimer
      | AnimState::PausedWaitStyleAvailable => true,
      AnimState::StartWaitResponse | AnimState::PausedWaitResponse => self.start_time.is_none(),
      _ => false,
    }
  }

  pub fn post_active(&self) -> bool {
    self.state == AnimState::Done
  }

  pub fn filling_forwards(&self) -> bool {
    self.state == AnimState::FillingForwards
  }

  fn handle(&self, ctx: &AnimationContext, data: &dyn InstanceCallbacks) -> InstanceHandle {
    (ctx.target, data.key())
  }

  /// Delivers one input. Directly re-entrant.
  pub fn update(
    &mut self,
    data: &mut dyn InstanceCallbacks,
    ctx: &mut AnimationContext,
    input: AnimationInput,
  ) {
    self.dispatch(data, ctx, input);
    assert_eq!(
      self.pause_time >= 0.0,
      self.state.is_paused(),
      "pause bookkeeping diverged from state {:?}",
      self.state
    );
  }

  fn dispatch(
    &mut self,
    data: &mut dyn InstanceCallbacks,
    ctx: &mut AnimationContext,
    input: AnimationInput,
  ) {
    let from_state = self.state;

    match input {
      AnimationInput::MakeNew => {
        self.leave_waiting_sets(data, ctx);
        self.end_accelerated_if_running(data, ctx);
        self.state = AnimState::New;
        self.start_time = None;
        self.pause_time = NOT_PAUSED;
        self.requested_start_time = None;
        self.next_iteration_start = NO_BOUNDARY;
        self.start_fired = false;
      }

      AnimationInput::RestartAnimation => {
        self.dispatch(data, ctx, AnimationInput::MakeNew);
        if !ctx.shared.is_suspended()
          && self.descriptor.play_state == AnimationPlayState::Running
        {
          self.dispatch(data, ctx, AnimationInput::StartAnimation);
        }
      }

      AnimationInput::EndAnimation => {
        self.leave_waiting_sets(data, ctx);
        self.end_accelerated_if_running(data, ctx);
        self.pause_time = NOT_PAUSED;
        self.state = AnimState::Done;
      }

      AnimationInput::StartAnimation => {
        debug_assert_eq!(self.state, AnimState::New);
        self.requested_start_time = Some(ctx.now);
        self.state = AnimState::StartWaitTimer;
        // Zero and negative delays fall straight through.
        self.fire_timers(data, ctx);
      }

      AnimationInput::StartTimerFired => {
        debug_assert_eq!(self.state, AnimState::StartWaitTimer);
        self.state = AnimState::StartWaitStyleAvailable;
        let handle = self.handle(ctx, data);
        ctx.shared.add_animation_waiting_for_style(handle);
        // The animated value may need a fresh style object (transform
        // list validity is computed against it), so force a pass.
        ctx.shared.mark_dirty(ctx.target);
      }

      AnimationInput::StyleAvailable => match self.state {
        AnimState::StartWaitStyleAvailable => {
          self.state = AnimState::StartWaitResponse;
          data.override_animations(ctx);
          self.issue_start(data, ctx);
        }
        AnimState::PausedWaitStyleAvailable => {
          self.state = AnimState::PausedWaitResponse;
          data.override_animations(ctx);
        }
        _ => {}
      },

      AnimationInput::StartTimeSet(time) => match self.state {
        AnimState::StartWaitResponse => {
          let handle = self.handle(ctx, data);
          ctx.shared.remove_animation_waiting_for_start_response(&handle);
          // Set-once: a second response (e.g. after a resume re-issued
          // the start) must not move an already-fixed start time.
          if self.start_time.is_none() {
            self.start_time = Some(time + self.descriptor.delay.min(0.0));
          }
          if !self.start_fired {
            self.start_fired = true;
            data.on_start(ctx, 0.0);
          }
          self.go_into_ending_or_looping_state(ctx.now);
          ctx.shared.mark_dirty(ctx.target);
          self.fire_timers(data, ctx);
        }
        AnimState::PausedWaitResponse => {
          let handle = self.handle(ctx, data);
          ctx.shared.remove_animation_waiting_for_start_response(&handle);
          // An accelerated response raced a manual pause. Apply the
          // start time with a pause-offset correction: the elapsed
          // time observed at the pause instant (zero, since the run
          // had not begun) is preserved.
          if self.start_time.is_none() {
            let start = time + self.descriptor.delay.min(0.0);
            self.start_time = Some(start);
            self.pause_time = start.max(0.0);
          }
          self.state = AnimState::PausedRun;
          if self.is_accelerated {
            data.pause_accelerated(ctx, self.get_elapsed_time(ctx.now));
          }
        }
        _ => {}
      },

      AnimationInput::LoopTimerFired(elapsed) => {
        debug_assert_eq!(self.state, AnimState::Looping);
        data.on_iteration(ctx, elapsed);
        self.go_into_ending_or_looping_state(ctx.now);
        ctx.shared.mark_dirty(ctx.target);
      }

      AnimationInput::EndTimerFired(elapsed) => {
        debug_assert!(matches!(
          self.state,
          AnimState::Looping | AnimState::Ending
        ));
        data.on_end(ctx, elapsed);
        self.end_accelerated_if_running(data, ctx);
        if self.descriptor.fill_mode.fills_forwards() {
          // Quasi-terminal: keep rendering the final frame, and keep
          // overridden transitions suppressed since our value wins.
          self.state = AnimState::FillingForwards;
        } else {
          self.state = AnimState::Done;
          data.resume_overridden_animations(ctx);
        }
        ctx.shared.mark_dirty(ctx.target);
      }

      AnimationInput::PauseOverride => {
        // A keyframe animation took the property over. The machine's
        // own paused-ness is untouched; only accelerated execution is
        // withdrawn so the compositor does not advance a value the
        // override is masking.
        if self.state == AnimState::StartWaitResponse {
          // No response will matter any more; take the software path.
          self.end_accelerated_if_running(data, ctx);
          self.dispatch(data, ctx, AnimationInput::StartTimeSet(ctx.now));
        } else if self.is_accelerated {
          data.end_accelerated(ctx);
          self.is_accelerated = false;
        }
      }

      AnimationInput::ResumeOverride => {
        if matches!(self.state, AnimState::Looping | AnimState::Ending) {
          // Hand the property back to the compositor mid-flight.
          if let Some(start) = self.start_time {
            let started = data.start_accelerated(ctx, ctx.now - start);
            self.is_accelerated = started;
          }
        }
      }

      AnimationInput::PlayStatePaused => {
        if let Some(paused) = self.paused_sibling() {
          self.pause_time = ctx.now.max(0.0);
          if matches!(self.state, AnimState::Looping | AnimState::Ending)
            && self.is_accelerated
          {
            data.pause_accelerated(ctx, self.get_elapsed_time(ctx.now));
          }
          self.state = paused;
        }
      }

      AnimationInput::PlayStateRunning => match self.state {
        AnimState::PausedNew => {
          self.pause_time = NOT_PAUSED;
          self.state = AnimState::New;
          if self.descriptor.play_state == AnimationPlayState::Running {
            self.dispatch(data, ctx, AnimationInput::StartAnimation);
          }
        }
        AnimState::PausedWaitTimer => {
          // Shift the requested start so the remaining delay is what
          // it was at the pause instant.
          if let Some(requested) = self.requested_start_time {
            self.requested_start_time = Some(requested + ctx.now - self.pause_time);
          }
          self.pause_time = NOT_PAUSED;
          self.state = AnimState::StartWaitTimer;
          self.fire_timers(data, ctx);
        }
        AnimState::PausedWaitStyleAvailable => {
          // Still registered in the waiting-for-style set; the next
          // style pass will deliver StyleAvailable.
          self.pause_time = NOT_PAUSED;
          self.state = AnimState::StartWaitStyleAvailable;
        }
        AnimState::PausedWaitResponse | AnimState::PausedRun => {
          // Lossless resume: push the start time forward by however
          // long we sat paused, then re-enter through the response
          // wait so accelerated execution is re-issued.
          if let Some(start) = self.start_time {
            self.start_time = Some(start + ctx.now - self.pause_time);
          }
          self.pause_time = NOT_PAUSED;
          self.state = AnimState::StartWaitResponse;
          self.issue_start(data, ctx);
        }
        _ => {}
      },
    }

    if self.state != from_state {
      debug!(
        "target {:?} {:?}: {:?} -> {:?} on {:?}",
        ctx.target,
        data.key(),
        from_state,
        self.state,
        input
      );
    }
  }

  /// Attempts the (possibly accelerated, possibly asynchronous) start
  /// from `StartWaitResponse`.
  fn issue_start(&mut self, data: &mut dyn InstanceCallbacks, ctx: &mut AnimationContext) {
    debug_assert_eq!(self.state, AnimState::StartWaitResponse);
    if data.overridden() {
      // Overridden instances run software-only and answer themselves
      // synchronously.
      self.is_accelerated = false;
      let handle = self.handle(ctx, data);
      ctx.shared.add_animation_waiting_for_start_response(handle, false);
      self.dispatch(data, ctx, AnimationInput::StartTimeSet(ctx.now));
      return;
    }
    let time_offset = match self.start_time {
      // Resume path: begin this far into the animation.
      Some(start) => ctx.now - start,
      // Fresh start: only a negative delay puts us past time zero.
      None => -self.descriptor.delay.min(0.0),
    };
    let started = data.start_accelerated(ctx, time_offset);
    self.is_accelerated = started;
    let handle = self.handle(ctx, data);
    ctx
      .shared
      .add_animation_waiting_for_start_response(handle, started);
  }

  fn paused_sibling(&self) -> Option<AnimState> {
    match self.state {
      AnimState::New => Some(AnimState::PausedNew),
      AnimState::StartWaitTimer => Some(AnimState::PausedWaitTimer),
      AnimState::StartWaitStyleAvailable => Some(AnimState::PausedWaitStyleAvailable),
      AnimState::StartWaitResponse => Some(AnimState::PausedWaitResponse),
      AnimState::Looping | AnimState::Ending => Some(AnimState::PausedRun),
      _ => None,
    }
  }

  fn leave_waiting_sets(&self, data: &dyn InstanceCallbacks, ctx: &mut AnimationContext) {
    let handle = (ctx.target, data.key());
    ctx.shared.remove_animation_waiting_for_style(&handle);
    ctx.shared.remove_animation_waiting_for_start_response(&handle);
  }

  fn end_accelerated_if_running(
    &mut self,
    data: &mut dyn InstanceCallbacks,
    ctx: &mut AnimationContext,
  ) {
    if self.is_accelerated {
      data.end_accelerated(ctx);
      self.is_accelerated = false;
    }
  }

  /// Delivers any timer inputs that are due at `ctx.now`: the start
  /// timer while waiting out the delay, loop/end boundaries while
  /// running. Called once per service from the composite.
  pub fn fire_timers(&mut self, data: &mut dyn InstanceCallbacks, ctx: &mut AnimationContext) {
    match self.state {
      AnimState::StartWaitTimer => {
        let requested = self.requested_start_time.unwrap_or(ctx.now);
        if ctx.now >= requested + self.descriptor.delay.max(0.0) {
          self.update(data, ctx, AnimationInput::StartTimerFired);
        }
      }
      AnimState::Looping | AnimState::Ending => {
        let elapsed = self.get_elapsed_time(ctx.now);
        if self.total_duration.is_finite() && elapsed >= self.total_duration {
          let total = self.total_duration;
          self.update(data, ctx, AnimationInput::EndTimerFired(total));
        } else if self.state == AnimState::Looping
          && self.next_iteration_start >= 0.0
          && elapsed >= self.next_iteration_start
        {
          // One iteration event per service even if several boundaries
          // were crossed; report the most recent one.
          let dur = self.descriptor.duration;
          let boundary = elapsed - elapsed % dur;
          self.update(data, ctx, AnimationInput::LoopTimerFired(boundary));
        }
      }
      _ => {}
    }
  }

  fn go_into_ending_or_looping_state(&mut self, now: f64) {
    let (time_left, is_looping) = self.get_time_to_next_event(now);
    if is_looping {
      self.next_iteration_start = self.get_elapsed_time(now) + time_left;
      self.state = AnimState::Looping;
    } else {
      self.next_iteration_start = NO_BOUNDARY;
      self.state = AnimState::Ending;
    }
  }

  /// Seconds until the next lifecycle boundary and whether that
  /// boundary is an iteration (true) or the final end (false).
  pub fn get_time_to_next_event(&self, now: f64) -> (f64, bool) {
    let dur = self.descriptor.duration;
    if dur <= 0.0 {
      return (0.0, false);
    }
    let elapsed = self.get_elapsed_time(now).max(0.0);
    let next_iteration = elapsed - elapsed % dur + dur;
    if self.total_duration.is_infinite() || next_iteration < self.total_duration {
      (next_iteration - elapsed, true)
    } else {
      ((self.total_duration - elapsed).max(0.0), false)
    }
  }

  /// Seconds of active animation time elapsed at `now`, excluding the
  /// delay (the start time is only fixed once the delay is served).
  pub fn get_elapsed_time(&self, now: f64) -> f64 {
    let start = match self.start_time {
      Some(start) => start,
      None => return 0.0,
    };
    if self.paused() {
      return (self.pause_time - start).max(0.0);
    }
    if self.post_active() || self.filling_forwards() {
      return if self.total_duration.is_finite() {
        self.total_duration
      } else {
        now - start
      };
    }
    now - start
  }

  /// Seconds until this instance next needs software servicing.
  /// -1 = never, 0 = now.
  pub fn time_to_next_service(&self, now: f64) -> f64 {
    if self.paused()
      || self.post_active()
      || self.filling_forwards()
      || self.state == AnimState::New
    {
      return -1.0;
    }
    if self.state == AnimState::StartWaitTimer {
      let requested = self.requested_start_time.unwrap_or(now);
      return (self.descriptor.delay.max(0.0) - (now - requested)).max(0.0);
    }
    0.0
  }

  /// Progress at `now`, eased through `timing_function` when one is
  /// given (`None` returns the raw fractional time, which keyframe
  /// interval resolution needs before it knows which keyframe's easing
  /// applies).
  ///
  /// `scale` and `offset` map an overall fractional time onto one
  /// keyframe interval (`(t - offset) * scale`); transitions pass
  /// `scale = 1, offset = 0`. Handles direction flips per iteration
  /// and the at-the-end parity of finite iteration counts.
  pub fn progress(
    &self,
    now: f64,
    scale: f64,
    offset: f64,
    timing_function: Option<&TimingFunction>,
  ) -> f64 {
    if self.pre_active() {
      return 0.0;
    }
    let dur = self.descriptor.duration;
    if dur <= 0.0 {
      return 1.0;
    }
    let count = self.descriptor.iteration_count;
    let elapsed = self.get_elapsed_time(now).max(0.0);

    let fractional_time = elapsed / dur;
    let clamped = if count.is_finite() {
      fractional_time.min(count)
    } else {
      fractional_time
    };
    let mut integral = clamped.floor();
    let mut frac = clamped - integral;
    // Exactly at the end of a whole final iteration, stay on that
    // iteration's closing edge instead of opening a new one.
    if count.is_finite() && clamped >= count && frac == 0.0 && integral > 0.0 {
      integral -= 1.0;
      frac = 1.0;
    }

    let odd_iteration = (integral as u64) % 2 == 1;
    let reversed = match self.descriptor.direction {
      Direction::Normal => false,
      Direction::Reverse => true,
      Direction::Alternate => odd_iteration,
      Direction::AlternateReverse => !odd_iteration,
    };
    let mut t = if reversed { 1.0 - frac } else { frac };

    if scale != 1.0 || offset != 0.0 {
      t = (t - offset) * scale;
    }

    match timing_function {
      Some(tf) => tf.evaluate(t, dur),
      None => t,
    }
  }

  /// Unit-test shortcut: places the machine mid-run without driving
  /// the full lifecycle.
  #[cfg(test)]
  pub(crate) fn force_running_at(&mut self, start_time: f64) {
    self.state = AnimState::Looping;
    self.start_time = Some(start_time);
    self.start_fired = true;
  }

  /// Test/tooling hook: freezes the instance `time` seconds after its
  /// requested start (the delay counts toward `time`). Synthesizes a
  /// start if none happened yet, then parks in `PausedRun`.
  pub fn freeze_at_time(
    &mut self,
    data: &mut dyn InstanceCallbacks,
    ctx: &mut AnimationContext,
    time: f64,
  ) {
    if self.start_time.is_none() {
      self.leave_waiting_sets(data, ctx);
      self.state = AnimState::StartWaitResponse;
      self.dispatch(data, ctx, AnimationInput::StartTimeSet(ctx.now));
    }
    let start = self.start_time.expect("freeze could not synthesize a start");
    self.pause_time = if time <= self.descriptor.delay {
      start.max(0.0)
    } else {
      (start + time - self.descriptor.delay).max(0.0)
    };
    self.state = AnimState::PausedRun;
    if self.is_accelerated {
      let offset = self.pause_time - start;
      data.pause_accelerated(ctx, offset);
    }
    ctx.shared.mark_dirty(ctx.target);
  }

  /// Reconciles the descriptor's declared play state after a style
  /// update replaced the descriptor.
  pub fn update_play_state(
    &mut self,
    data: &mut dyn InstanceCallbacks,
    ctx: &mut AnimationContext,
    play_state: AnimationPlayState,
  ) {
    match play_state {
      AnimationPlayState::Paused if !self.paused() => {
        self.update(data, ctx, AnimationInput::PlayStatePaused);
      }
      AnimationPlayState::Running if self.paused() && !ctx.shared.is_suspended() => {
        self.update(data, ctx, AnimationInput::PlayStateRunning);
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::animation::clock::ManualClock;
  use crate::animation::FillMode;
  use crate::compositor::NullCompositor;

  /// Software-only callbacks that count lifecycle starts.
  struct CountingCallbacks {
    starts: u32,
  }

  impl InstanceCallbacks for CountingCallbacks {
    fn key(&self) -> InstanceKey {
      InstanceKey::Transition(PropertyId::Width)
    }

    fn on_start(&mut self, _ctx: &mut AnimationContext, _elapsed: f64) {
      self.starts += 1;
    }

    fn on_iteration(&mut self, _ctx: &mut AnimationContext, _elapsed: f64) {}

    fn on_end(&mut self, _ctx: &mut AnimationContext, _elapsed: f64) {}

    fn start_accelerated(&mut self, _ctx: &mut AnimationContext, _time_offset: f64) -> bool {
      false
    }

    fn pause_accelerated(&mut self, _ctx: &mut AnimationContext, _time_offset: f64) {}

    fn end_accelerated(&mut self, _ctx: &mut AnimationContext) {}

    fn override_animations(&mut self, _ctx: &mut AnimationContext) {}

    fn resume_overridden_animations(&mut self, _ctx: &mut AnimationContext) {}
  }

  fn machine(duration: f64, count: f64, direction: Direction) -> Machine {
    let descriptor = AnimationDescriptor {
      duration,
      delay: 0.0,
      iteration_count: count,
      direction,
      fill_mode: FillMode::None,
      play_state: AnimationPlayState::Running,
      timing_function: TimingFunction::Linear,
      ..AnimationDescriptor::keyframes("test", duration)
    };
    let mut m = Machine::new(Arc::new(descriptor));
    m.state = AnimState::Looping;
    m.start_time = Some(0.0);
    m
  }

  #[test]
  fn progress_direction_parity_at_boundaries() {
    use Direction::*;
    // (direction, elapsed in durations, expected progress)
    let cases = [
      (Normal, 0.0, 0.0),
      (Normal, 0.5, 0.5),
      (Normal, 1.5, 0.5),
      (Reverse, 0.5, 0.5),
      (Reverse, 0.25, 0.75),
      (Alternate, 0.5, 0.5),
      (Alternate, 1.5, 0.5),
      (Alternate, 1.25, 0.75),
      (AlternateReverse, 0.25, 0.75),
      (AlternateReverse, 1.25, 0.25),
    ];
    for (direction, elapsed, expected) in cases {
      let m = machine(1.0, 4.0, direction);
      let got = m.progress(elapsed, 1.0, 0.0, None);
      assert!(
        (got - expected).abs() < 1e-9,
        "{direction:?} at {elapsed}: got {got}, expected {expected}"
      );
    }
  }

  #[test]
  fn progress_end_value_parity() {
    // normal x1 ends at 1, alternate x2 ends at 0, alternate x3 at 1.
    let cases = [
      (Direction::Normal, 1.0, 1.0, 1.0),
      (Direction::Alternate, 2.0, 2.0, 0.0),
      (Direction::Alternate, 3.0, 3.0, 1.0),
      (Direction::AlternateReverse, 2.0, 2.0, 1.0),
      // Fractional count: stops mid-iteration.
      (Direction::Normal, 1.5, 1.5, 0.5),
    ];
    for (direction, count, elapsed, expected) in cases {
      let m = machine(1.0, count, direction);
      let got = m.progress(elapsed, 1.0, 0.0, None);
      assert!(
        (got - expected).abs() < 1e-9,
        "{direction:?} count {count}: got {got}, expected {expected}"
      );
    }
  }

  #[test]
  fn alternate_flip_at_one_and_a_half() {
    // Two 1s iterations, alternate: at 1.5s the integral time is odd,
    // so the fractional half is flipped to 0.5.
    let m = machine(1.0, 2.0, Direction::Alternate);
    assert!((m.progress(1.5, 1.0, 0.0, None) - 0.5).abs() < 1e-9);
    // And just short of the boundary it approaches 1 from below.
    assert!(m.progress(0.9, 1.0, 0.0, None) > 0.85);
    assert!(m.progress(1.1, 1.0, 0.0, None) > 0.85);
  }

  #[test]
  fn scale_and_offset_map_onto_keyframe_intervals() {
    // Interval [0.25, 0.75]: offset 0.25, scale 1/0.5.
    let m = machine(1.0, 1.0, Direction::Normal);
    let got = m.progress(0.5, 2.0, 0.25, Some(&TimingFunction::Linear));
    assert!((got - 0.5).abs() < 1e-9);
  }

  #[test]
  fn time_to_next_event_loops_then_ends() {
    let m = machine(1.0, 2.0, Direction::Normal);
    let (t, looping) = m.get_time_to_next_event(0.25);
    assert!((t - 0.75).abs() < 1e-9);
    assert!(looping);
    let (t, looping) = m.get_time_to_next_event(1.25);
    assert!((t - 0.75).abs() < 1e-9);
    assert!(!looping);
  }

  #[test]
  fn infinite_iterations_always_loop() {
    let m = machine(1.0, f64::INFINITY, Direction::Normal);
    let (_, looping) = m.get_time_to_next_event(1000.25);
    assert!(looping);
  }

  #[test]
  fn paused_elapsed_time_is_frozen() {
    let mut m = machine(1.0, 1.0, Direction::Normal);
    m.state = AnimState::PausedRun;
    m.pause_time = 0.4;
    assert!((m.get_elapsed_time(99.0) - 0.4).abs() < 1e-9);
    assert_eq!(m.time_to_next_service(99.0), -1.0);
  }

  #[test]
  fn start_time_is_fixed_by_the_first_response_only() {
    let mut shared = ControllerShared::new(Box::new(ManualClock::new()), Box::new(NullCompositor));
    let mut data = CountingCallbacks { starts: 0 };
    let mut ctx = AnimationContext {
      target: TargetId(1),
      now: 2.0,
      shared: &mut shared,
    };

    let mut m = Machine::new(Arc::new(AnimationDescriptor::keyframes("test", 1.0)));
    m.state = AnimState::StartWaitResponse;
    m.update(&mut data, &mut ctx, AnimationInput::StartTimeSet(2.0));
    assert_eq!(m.start_time(), Some(2.0));
    assert_eq!(data.starts, 1);

    // A resume re-enters the response wait; a second response must not
    // move the already-fixed start time or re-fire the start event.
    m.state = AnimState::StartWaitResponse;
    m.update(&mut data, &mut ctx, AnimationInput::StartTimeSet(7.0));
    assert_eq!(m.start_time(), Some(2.0));
    assert_eq!(data.starts, 1);
  }

  #[test]
  fn pre_active_progress_is_zero() {
    let mut m = machine(1.0, 1.0, Direction::Reverse);
    m.state = AnimState::StartWaitTimer;
    m.start_time = None;
    assert_eq!(m.progress(0.5, 1.0, 0.0, None), 0.0);
  }
}
