pub mod animation;
pub mod blend;
pub mod compositor;
pub mod error;
pub mod events;
pub mod style;
pub mod timing;

pub use error::{Error, Result};

pub use animation::clock::{Clock, ManualClock, MonotonicClock};
pub use animation::controller::{AnimationController, KeyframeRegistry, TimerSchedule};
pub use animation::{
  AnimationDescriptor, AnimationPlayState, Direction, FillMode, Keyframe, KeyframeList, TargetId,
};
pub use blend::{PropertyId, TransitionProperty};
pub use compositor::{CompositorBackend, NullCompositor};
pub use events::{AnimationEvent, AnimationEventKind};
pub use style::values::{Length, Rgba};
pub use style::AnimatedStyle;
pub use timing::TimingFunction;
