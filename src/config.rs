//! Limb, pose and animation definitions, validated once at load.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    constants::*,
    error::{EntityKind, Result, RobotError, ValidationError},
    types::{Animation, Limb, Pose, Units},
};

/// Immutable, validated reference data for one robot.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    units: Units,
    limbs: HashMap<String, Limb>,
    poses: HashMap<String, Pose>,
    animations: HashMap<String, Animation>,
}

impl ConfigStore {
    pub fn load(limbs: Vec<Limb>, poses: Vec<Pose>, animations: Vec<Animation>) -> Result<Self> {
        Self::load_with_units(Units::Degrees, limbs, poses, animations)
    }

    /// Validates everything before building; a failure returns no store at all.
    pub fn load_with_units(
        units: Units,
        limbs: Vec<Limb>,
        poses: Vec<Pose>,
        animations: Vec<Animation>,
    ) -> Result<Self> {
        let limbs = validate_limbs(limbs)?;
        let poses = validate_poses(&limbs, poses)?;
        let animations = validate_animations(&poses, animations)?;

        debug!(
            %units,
            limbs = limbs.len(),
            poses = poses.len(),
            animations = animations.len(),
            "configuration loaded"
        );

        Ok(ConfigStore {
            units,
            limbs,
            poses,
            animations,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let (store, _) = ConfigFile::from_json_str(json)?.into_parts()?;
        Ok(store)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let (store, _) = ConfigFile::from_path(path)?.into_parts()?;
        Ok(store)
    }

    /// Loads the three-file layout: a config file holding `limbs`, plus
    /// standalone pose and animation maps.
    pub fn from_split_paths(
        config: impl AsRef<Path>,
        poses: impl AsRef<Path>,
        animations: impl AsRef<Path>,
    ) -> Result<(Self, LinkSettings)> {
        let mut file = ConfigFile::from_path(config)?;
        file.poses = serde_json::from_str(&fs::read_to_string(poses)?)?;
        file.animations = serde_json::from_str(&fs::read_to_string(animations)?)?;
        file.into_parts()
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn limb(&self, name: &str) -> Result<&Limb> {
        self.limbs
            .get(name)
            .ok_or_else(|| RobotError::not_found(EntityKind::Limb, name))
    }

    pub fn pose(&self, name: &str) -> Result<&Pose> {
        self.poses
            .get(name)
            .ok_or_else(|| RobotError::not_found(EntityKind::Pose, name))
    }

    pub fn animation(&self, name: &str) -> Result<&Animation> {
        self.animations
            .get(name)
            .ok_or_else(|| RobotError::not_found(EntityKind::Animation, name))
    }

    pub fn limbs(&self) -> impl Iterator<Item = &Limb> {
        self.limbs.values()
    }

    pub fn poses(&self) -> impl Iterator<Item = &Pose> {
        self.poses.values()
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }
}

fn validate_limbs(limbs: Vec<Limb>) -> Result<HashMap<String, Limb>, ValidationError> {
    let mut by_name = HashMap::with_capacity(limbs.len());
    let mut pins: HashMap<i32, String> = HashMap::new();

    for limb in limbs {
        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&limb.motor_pin) {
            return Err(ValidationError::PinOutOfRange {
                limb: limb.name,
                pin: limb.motor_pin,
            });
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&limb.default_speed) {
            return Err(ValidationError::SpeedOutOfRange {
                limb: limb.name,
                speed: limb.default_speed,
            });
        }
        if let Some(other) = pins.insert(limb.motor_pin, limb.name.clone()) {
            warn!(pin = limb.motor_pin, first = %other, second = %limb.name, "motor pin shared by two limbs");
        }
        if by_name.contains_key(&limb.name) {
            return Err(ValidationError::Duplicate {
                kind: EntityKind::Limb,
                name: limb.name,
            });
        }
        by_name.insert(limb.name.clone(), limb);
    }

    Ok(by_name)
}

fn validate_poses(
    limbs: &HashMap<String, Limb>,
    poses: Vec<Pose>,
) -> Result<HashMap<String, Pose>, ValidationError> {
    let referenced: BTreeSet<&str> = poses
        .iter()
        .flat_map(|pose| pose.targets.keys())
        .map(String::as_str)
        .collect();

    if let Some(unknown) = referenced.iter().find(|name| !limbs.contains_key(**name)) {
        let pose = poses
            .iter()
            .find(|pose| pose.targets.contains_key(*unknown))
            .map(|pose| pose.name.clone())
            .unwrap_or_default();
        return Err(ValidationError::UnknownLimb {
            pose,
            limb: unknown.to_string(),
        });
    }

    let mut by_name = HashMap::with_capacity(poses.len());
    for pose in poses {
        if by_name.contains_key(&pose.name) {
            return Err(ValidationError::Duplicate {
                kind: EntityKind::Pose,
                name: pose.name,
            });
        }
        by_name.insert(pose.name.clone(), pose);
    }
    Ok(by_name)
}

fn validate_animations(
    poses: &HashMap<String, Pose>,
    animations: Vec<Animation>,
) -> Result<HashMap<String, Animation>, ValidationError> {
    let mut by_name = HashMap::with_capacity(animations.len());
    for animation in animations {
        if let Some(step) = animation.steps.iter().find(|step| !poses.contains_key(&step.pose)) {
            return Err(ValidationError::UnknownPose {
                animation: animation.name.clone(),
                pose: step.pose.clone(),
            });
        }
        if by_name.contains_key(&animation.name) {
            return Err(ValidationError::Duplicate {
                kind: EntityKind::Animation,
                name: animation.name,
            });
        }
        by_name.insert(animation.name.clone(), animation);
    }
    Ok(by_name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimbEntry {
    pub motor_pin: i32,
    pub default_speed: i32,
}

/// On-disk configuration schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub limbs: BTreeMap<String, LimbEntry>,
    #[serde(default)]
    pub poses: BTreeMap<String, BTreeMap<String, i32>>,
    #[serde(default)]
    pub animations: BTreeMap<String, Vec<(String, u64)>>,
    #[serde(default)]
    pub link: LinkSettings,
}

impl ConfigFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn into_parts(self) -> Result<(ConfigStore, LinkSettings)> {
        let limbs = self
            .limbs
            .into_iter()
            .map(|(name, entry)| Limb::new(name, entry.motor_pin, entry.default_speed))
            .collect();
        let poses = self
            .poses
            .into_iter()
            .map(|(name, targets)| Pose::new(name, targets))
            .collect();
        let animations = self
            .animations
            .into_iter()
            .map(|(name, steps)| Animation::new(name, steps))
            .collect();

        let store = ConfigStore::load_with_units(self.units, limbs, poses, animations)?;
        Ok((store, self.link))
    }
}

/// Where and how to reach the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkSettings {
    /// Serial port path; discovered by USB id when absent.
    pub port: Option<String>,
    pub serial_number: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub bluetooth: BluetoothSettings,
}

impl Default for LinkSettings {
    fn default() -> Self {
        LinkSettings {
            port: None,
            serial_number: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            heartbeat_timeout_ms: 100,
            bluetooth: BluetoothSettings::default(),
        }
    }
}

impl LinkSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BluetoothSettings {
    /// Hardware address such as `88:22:B2:F4:5C:32`.
    pub address: Option<String>,
    pub local_name: Option<String>,
    pub service_uuid: Uuid,
    pub write_uuid: Uuid,
    pub notify_uuid: Uuid,
    pub scan_timeout_ms: u64,
}

impl Default for BluetoothSettings {
    fn default() -> Self {
        BluetoothSettings {
            address: None,
            local_name: None,
            service_uuid: UART_SERVICE_UUID,
            write_uuid: UART_RX_CHAR_UUID,
            notify_uuid: UART_TX_CHAR_UUID,
            scan_timeout_ms: 5000,
        }
    }
}

impl BluetoothSettings {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}
