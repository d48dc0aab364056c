//! Callback name registries
//!
//! Scripting code subscribes to platform events by string name. Each wrapper
//! kind has a fixed, built-in set of names; they are modeled as enums with a
//! static lookup table so that dispatch never compares strings.

use std::fmt;
use std::str::FromStr;

use crate::error::WsError;

macro_rules! callback_registry {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $js:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every entry in registration-table order
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// The name scripting code uses to subscribe
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $js, )+
                }
            }

            /// Resolve a scripting-side name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $js => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = WsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s).ok_or_else(|| WsError::UnknownCallback(s.to_string()))
            }
        }
    };
}

callback_registry! {
    /// Events a single scene session can report to scripting code
    pub enum SceneSessionEvent {
        /// Request to activate a pending session
        PendingSceneSessionActivation => "pendingSceneSessionActivation",
        SessionStateChange => "sessionStateChange",
        /// Surface buffer became (un)available
        BufferAvailableChange => "bufferAvailableChange",
        SessionEvent => "sessionEvent",
        SessionRectChange => "sessionRectChange",
        RaiseToTop => "raiseToTop",
        BackPressed => "backPressed",
        SessionFocusableChange => "sessionFocusableChange",
        SessionTouchableChange => "sessionTouchableChange",
        Click => "click",
        TerminateSession => "terminateSession",
        SessionException => "sessionException",
        UpdateSessionLabel => "updateSessionLabel",
        NeedAvoid => "needAvoid",
        ShowWhenLocked => "showWhenLocked",
        RequestedOrientationChange => "requestedOrientationChange",
        RaiseAboveTarget => "raiseAboveTarget",
        LandscapeMultiWindow => "landscapeMultiWindow",
        KeyboardGravityChange => "keyboardGravityChange",
        LayoutFullScreenChange => "layoutFullScreenChange",
    }
}

callback_registry! {
    /// Events the session manager reports to scripting code
    pub enum ManagerEvent {
        CreateSpecificSession => "createSpecificSession",
        CreateKeyboardSession => "createKeyboardSession",
        RecoverSceneSession => "recoverSceneSession",
        StatusBarEnabledChange => "statusBarEnabledChange",
        GestureNavigationEnabledChange => "gestureNavigationEnabledChange",
        OutsideDownEvent => "outsideDownEvent",
        ShiftFocus => "shiftFocus",
        CallingWindowIdChange => "callingWindowIdChange",
        StartUiAbilityError => "startUIAbilityError",
        SwitchToAnotherUser => "switchToAnotherUser",
    }
}

callback_registry! {
    /// Events the root scene reports to scripting code
    pub enum RootSceneEvent {
        PendingSceneSessionActivation => "pendingSceneSessionActivation",
    }
}
