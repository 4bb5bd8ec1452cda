/*!
 * Opcode Spaces
 * The four 8-bit action enumerations, disambiguated by direction
 */

/// How an inbound request is scheduled.
///
/// Stream traffic must execute in exact arrival order; everything else fans
/// out across the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingClass {
    StreamOrdered,
    Parallel,
}

macro_rules! opcode_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),+
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(opcode: $name) -> u8 {
                opcode as u8
            }
        }
    };
}

opcode_enum! {
    /// Requests the controller sends to this host
    ControllerOpcode {
        Ping = 0,
        Print = 1,
        Echo = 2,
        WindowCreate = 3,
        WindowSetDevelopmentToolsEnabled = 5,
        WindowLoadUrl = 6,
        WindowGetPosition = 14,
        WindowSetPosition = 15,
        WindowMaximize = 17,
        WindowMinimize = 18,
        WindowRestore = 19,
        WindowShow = 20,
        WindowHide = 21,
        WindowClose = 22,
        WindowRequestFocus = 25,
        WindowActivate = 28,
        WindowBringToTop = 29,
        WindowSetAlwaysOnTop = 30,
        WindowSetFullscreen = 31,
        WindowCenterSelf = 32,
        WindowSetProxyRequests = 33,
        WindowSetModifyRequests = 34,
        StreamOpen = 35,
        StreamClose = 36,
        StreamData = 37,
        PickFile = 38,
        PickDirectory = 39,
        SaveFile = 40,
        WindowExecuteDevToolsMethod = 41,
        WindowSetDevelopmentToolsVisible = 42,
        WindowSetTitle = 43,
        WindowSetIcon = 44,
        WindowAddUrlToProxy = 45,
        WindowRemoveUrlToProxy = 46,
        WindowAddUrlToModify = 47,
        WindowRemoveUrlToModify = 48,
        WindowGetSize = 49,
        WindowSetSize = 50,
        WindowAddDevToolsEventMethod = 51,
        WindowRemoveDevToolsEventMethod = 52,
    }
}

opcode_enum! {
    /// Notifications the controller sends to this host
    ControllerNotification {
        Exit = 0,
    }
}

opcode_enum! {
    /// Requests this host sends to the controller
    HostOpcode {
        Ping = 0,
        Print = 1,
        Echo = 2,
        WindowProxyRequest = 3,
        WindowModifyRequest = 4,
        StreamClose = 5,
    }
}

opcode_enum! {
    /// Notifications this host sends to the controller
    HostNotification {
        Ready = 0,
        Exit = 1,
        WindowOpened = 2,
        WindowClosed = 3,
        WindowFocused = 5,
        WindowUnfocused = 6,
        WindowFullscreenChanged = 12,
        WindowLoadStart = 13,
        WindowLoadEnd = 14,
        WindowLoadError = 15,
        WindowDevToolsEvent = 16,
    }
}

impl ControllerOpcode {
    pub fn ordering_class(self) -> OrderingClass {
        match self {
            ControllerOpcode::StreamOpen
            | ControllerOpcode::StreamData
            | ControllerOpcode::StreamClose => OrderingClass::StreamOrdered,
            _ => OrderingClass::Parallel,
        }
    }
}
