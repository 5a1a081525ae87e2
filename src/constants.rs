use uuid::Uuid;

// USB-serial bridge on the Witmotion 16 channel board (CH340)
pub const VENDOR_ID: u16 = 0x1a86;
pub const PRODUCT_ID: u16 = 0x7523;
pub const DEFAULT_BAUD_RATE: u32 = 9600;

pub const HEADER: u8 = 0xff;

// Command constants
pub const CMD_HEARTBEAT: u8 = 0x00;
pub const CMD_SET_SPEED: u8 = 0x01;
pub const CMD_SET_POSITION: u8 = 0x02;
pub const CMD_EXECUTE_ACTION_GROUP: u8 = 0x09;
pub const CMD_EMERGENCY: u8 = 0x0b;

pub const HEARTBEAT_REQUEST: [u8; 5] = [HEADER, CMD_HEARTBEAT, 0x12, 0x00, 0x00];
pub const HEARTBEAT_ACK: [u8; 5] = [HEADER, 0xf0, 0x12, 0x00, 0x00];

/// Zero bytes trailing the five byte emergency command.
pub const EMERGENCY_PADDING: usize = 56;

// Servo range constants
pub const MIN_CHANNEL: i32 = 0;
pub const MAX_CHANNEL: i32 = 15;
pub const MIN_ANGLE: i32 = 0;
pub const MAX_ANGLE: i32 = 180;
pub const MIN_PULSE: i32 = 500;
pub const MAX_PULSE: i32 = 2500;
pub const MIN_SPEED: i32 = 1;
pub const MAX_SPEED: i32 = 255;
pub const MIN_ACTION_GROUP: i32 = 1;
pub const MAX_ACTION_GROUP: i32 = 16;

pub const NEUTRAL_POSE: &str = "neutral";

// Nordic UART service exposed by the wireless bridge
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);
pub const UART_RX_CHAR_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);
pub const UART_TX_CHAR_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);
