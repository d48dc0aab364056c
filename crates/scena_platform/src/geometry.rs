//! Session geometry and descriptive types

use serde::{Deserialize, Serialize};

/// Window rectangle in physical pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WsRect {
    pub pos_x: i32,
    pub pos_y: i32,
    pub width: i32,
    pub height: i32,
}

impl WsRect {
    pub const fn new(pos_x: i32, pos_y: i32, width: i32, height: i32) -> Self {
        Self {
            pos_x,
            pos_y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Why a session's rect changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeChangeReason {
    #[default]
    Undefined,
    Maximize,
    Recover,
    Rotation,
    Drag,
    DragStart,
    DragEnd,
    Resize,
    Move,
    Hide,
}

impl SizeChangeReason {
    /// Numeric value exposed to scripting code
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Session lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Disconnect,
    Connect,
    Foreground,
    Active,
    Inactive,
    Background,
    End,
}

impl SessionState {
    pub const ALL: &'static [SessionState] = &[
        SessionState::Disconnect,
        SessionState::Connect,
        SessionState::Foreground,
        SessionState::Active,
        SessionState::Inactive,
        SessionState::Background,
        SessionState::End,
    ];

    /// Numeric value exposed to scripting code
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Enum member name exposed to scripting code
    pub const fn js_name(self) -> &'static str {
        match self {
            SessionState::Disconnect => "STATE_DISCONNECT",
            SessionState::Connect => "STATE_CONNECT",
            SessionState::Foreground => "STATE_FOREGROUND",
            SessionState::Active => "STATE_ACTIVE",
            SessionState::Inactive => "STATE_INACTIVE",
            SessionState::Background => "STATE_BACKGROUND",
            SessionState::End => "STATE_END",
        }
    }
}

/// Where a soft keyboard docks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardGravity {
    #[default]
    Default,
    Bottom,
    Float,
}

impl KeyboardGravity {
    pub const ALL: &'static [KeyboardGravity] = &[
        KeyboardGravity::Default,
        KeyboardGravity::Bottom,
        KeyboardGravity::Float,
    ];

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn js_name(self) -> &'static str {
        match self {
            KeyboardGravity::Default => "GRAVITY_DEFAULT",
            KeyboardGravity::Bottom => "GRAVITY_BOTTOM",
            KeyboardGravity::Float => "GRAVITY_FLOAT",
        }
    }
}

/// What kind of window a session backs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    #[default]
    App,
    System,
    Keyboard,
    KeyboardPanel,
}

/// Identity of the ability a session displays
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionInfo {
    pub bundle_name: String,
    pub module_name: String,
    pub ability_name: String,
    #[serde(default)]
    pub session_type: SessionType,
}

impl SessionInfo {
    pub fn new(
        bundle_name: impl Into<String>,
        module_name: impl Into<String>,
        ability_name: impl Into<String>,
    ) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            module_name: module_name.into(),
            ability_name: ability_name.into(),
            session_type: SessionType::App,
        }
    }

    pub fn with_type(mut self, session_type: SessionType) -> Self {
        self.session_type = session_type;
        self
    }

    /// Display name, `bundle/module/ability`
    pub fn session_name(&self) -> String {
        format!(
            "{}/{}/{}",
            self.bundle_name, self.module_name, self.ability_name
        )
    }

    /// Whether enough is set to identify an ability
    pub fn is_valid(&self) -> bool {
        !self.bundle_name.is_empty() && !self.ability_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_empty() {
        assert!(WsRect::default().is_empty());
        assert!(!WsRect::new(0, 0, 10, 10).is_empty());
        assert!(WsRect::new(5, 5, 10, -1).is_empty());
    }

    #[test]
    fn test_session_info_name_and_validity() {
        let info = SessionInfo::new("com.example.app", "entry", "MainAbility");
        assert_eq!(info.session_name(), "com.example.app/entry/MainAbility");
        assert!(info.is_valid());
        assert!(!SessionInfo::default().is_valid());
    }

    #[test]
    fn test_state_numeric_values_follow_declaration_order() {
        for (index, state) in SessionState::ALL.iter().enumerate() {
            assert_eq!(state.as_u32() as usize, index);
        }
    }

    #[test]
    fn test_session_info_serializes() {
        let info = SessionInfo::new("b", "m", "a").with_type(SessionType::System);
        let json = serde_json::to_string(&info).unwrap();
        let back: SessionInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
