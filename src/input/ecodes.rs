// Event codes as standardized in the linux kernel
// See https://github.com/torvalds/linux/blob/master/include/uapi/linux/input-event-codes.h

// Event types
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;

// Syn events delimit report cycles
pub const SYN_REPORT: u16 = 0x00;
pub const SYN_CONFIG: u16 = 0x01;
pub const SYN_MT_REPORT: u16 = 0x02; // Protocol A only
pub const SYN_DROPPED: u16 = 0x03;

// Absolute (single touch)
pub const ABS_X: u16 = 0x00; // = 0
pub const ABS_Y: u16 = 0x01; // = 1
pub const ABS_PRESSURE: u16 = 0x18; // = 24
pub const ABS_DISTANCE: u16 = 0x19; // = 25
pub const ABS_TILT_X: u16 = 0x1a; // = 26
pub const ABS_TILT_Y: u16 = 0x1b; // = 27
pub const ABS_TOOL_WIDTH: u16 = 0x1c; // = 28

// Absolute Multitouch
pub const ABS_MT_SLOT: u16 = 0x2f; // = 47
pub const ABS_MT_TOUCH_MAJOR: u16 = 0x30; // = 48
pub const ABS_MT_TOUCH_MINOR: u16 = 0x31; // = 49
pub const ABS_MT_WIDTH_MAJOR: u16 = 0x32; // = 50
pub const ABS_MT_WIDTH_MINOR: u16 = 0x33; // = 51
pub const ABS_MT_ORIENTATION: u16 = 0x34; // = 52
pub const ABS_MT_POSITION_X: u16 = 0x35; // = 53
pub const ABS_MT_POSITION_Y: u16 = 0x36; // = 54
pub const ABS_MT_TOOL_TYPE: u16 = 0x37; // = 55
pub const ABS_MT_BLOB_ID: u16 = 0x38; // = 56
pub const ABS_MT_TRACKING_ID: u16 = 0x39; // = 57
pub const ABS_MT_PRESSURE: u16 = 0x3a; // = 58
pub const ABS_MT_DISTANCE: u16 = 0x3b; // = 59
pub const ABS_MT_TOOL_X: u16 = 0x3c; // = 60
pub const ABS_MT_TOOL_Y: u16 = 0x3d; // = 61

/// Value of `ABS_MT_TRACKING_ID` announcing that the contact in the current slot lifted
pub const TRACKING_ID_LIFTED: i32 = -1;
