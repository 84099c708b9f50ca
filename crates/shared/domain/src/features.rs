//! Device feature sets and client feature profiles.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Device capabilities, in the order clients enumerate them.
    ///
    /// New features are only ever appended; the order is part of the profile signature format.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FeatureSet: u64 {
        const APPS = 1 << 0;
        const PACKAGED_APPS = 1 << 1;
        const PAY = 1 << 2;
        const ACTIVITY = 1 << 3;
        const LIGHT_EVENTS = 1 << 4;
        const ARCHIVE = 1 << 5;
        const BATTERY = 1 << 6;
        const BLUETOOTH = 1 << 7;
        const CONTACTS = 1 << 8;
        const DEVICE_STORAGE = 1 << 9;
        const INDEXEDDB = 1 << 10;
        const GEOLOCATION = 1 << 11;
        const IDLE = 1 << 12;
        const NETWORK_INFO = 1 << 13;
        const NETWORK_STATS = 1 << 14;
        const PROXIMITY = 1 << 15;
        const PUSH = 1 << 16;
        const ORIENTATION = 1 << 17;
        const TIME_CLOCK = 1 << 18;
        const VIBRATE = 1 << 19;
        const FM = 1 << 20;
        const SMS = 1 << 21;
        const TOUCH = 1 << 22;
        const QHD = 1 << 23;
        const MP3 = 1 << 24;
        const AUDIO = 1 << 25;
        const WEBAUDIO = 1 << 26;
        const VIDEO_H264 = 1 << 27;
        const VIDEO_WEBM = 1 << 28;
        const FULLSCREEN = 1 << 29;
        const GAMEPAD = 1 << 30;
        const QUOTA = 1 << 31;
        const CAMERA = 1 << 32;
        const MIC = 1 << 33;
        const SCREEN_CAPTURE = 1 << 34;
        const WEBRTC_MEDIA = 1 << 35;
        const WEBRTC_DATA = 1 << 36;
        const WEBRTC_PEER = 1 << 37;
        const SPEECH_SYN = 1 << 38;
        const SPEECH_REC = 1 << 39;
        const POINTER_LOCK = 1 << 40;
        const NOTIFICATION = 1 << 41;
        const ALARM = 1 << 42;
        const SYSTEMXHR = 1 << 43;
        const TCPSOCKET = 1 << 44;
        const THIRDPARTY_KEYBOARD_SUPPORT = 1 << 45;
        const NETWORK_INFO_MULTIPLE = 1 << 46;
        const MOBILEID = 1 << 47;
        const PRECOMPILE_ASMJS = 1 << 48;
        const HARDWARE_512MB_RAM = 1 << 49;
        const HARDWARE_1GB_RAM = 1 << 50;
        const NFC = 1 << 51;
        const OPENMOBILEACL = 1 << 52;
    }
}

impl FeatureSet {
    /// Number of known features.
    #[must_use]
    pub fn known_count() -> u32 {
        Self::all().bits().count_ones()
    }

    /// Lower-case keys of the contained features (`"apps"`, `"webaudio"`, ...).
    pub fn keys(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase())
    }

    /// Parses a lower-case feature key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::from_name(&key.to_ascii_uppercase())
    }
}

impl Serialize for FeatureSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.keys())
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keys = Vec::<String>::deserialize(deserializer)?;
        keys.iter().try_fold(Self::empty(), |acc, key| {
            Self::from_key(key)
                .map(|flag| acc | flag)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown feature '{key}'")))
        })
    }
}

/// Reasons a profile signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    Format,
    Bits,
    Count,
}

/// Capabilities reported by a client device.
///
/// The signature is `"<hex bits>.<feature count>.<version>"`. The client enumerates its
/// `count` features in order and encodes the last one as bit 0, so feature `i` of the known
/// list sits at bit `count - 1 - i`. Features the client does not know about (index `>= count`)
/// are unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureProfile {
    supported: FeatureSet,
    version: u32,
}

impl FeatureProfile {
    /// Decodes a client signature.
    ///
    /// # Errors
    /// Returns [`SignatureError`] when any of the three components is malformed.
    pub fn from_signature(signature: &str) -> Result<Self, SignatureError> {
        let mut parts = signature.split('.');
        let (Some(hex), Some(count), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SignatureError::Format);
        };

        let bits = u64::from_str_radix(hex, 16).map_err(|_| SignatureError::Bits)?;
        let count: u32 = count.parse().map_err(|_| SignatureError::Count)?;
        if count > u64::BITS {
            return Err(SignatureError::Count);
        }
        let version: u32 = version.parse().map_err(|_| SignatureError::Format)?;

        let supported = FeatureSet::all().iter().enumerate().fold(
            FeatureSet::empty(),
            |acc, (index, flag)| {
                let Ok(index) = u32::try_from(index) else { return acc };
                if index >= count {
                    return acc;
                }
                let bit = count - 1 - index;
                if bits & (1 << bit) == 0 { acc } else { acc | flag }
            },
        );

        Ok(Self { supported, version })
    }

    #[must_use]
    pub const fn from_supported(supported: FeatureSet) -> Self {
        Self { supported, version: 1 }
    }

    #[must_use]
    pub const fn supported(&self) -> FeatureSet {
        self.supported
    }

    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Features the device lacks; listings requiring any of these are excluded.
    #[must_use]
    pub fn unsupported(&self) -> FeatureSet {
        FeatureSet::all().difference(self.supported)
    }

    #[must_use]
    pub const fn is_compatible(&self, required: FeatureSet) -> bool {
        self.supported.contains(required)
    }

    /// Encodes the profile back into a signature with the full known feature count.
    #[must_use]
    pub fn to_signature(&self) -> String {
        let count = FeatureSet::known_count();
        let bits = FeatureSet::all().iter().enumerate().fold(0_u64, |acc, (index, flag)| {
            let Ok(index) = u32::try_from(index) else { return acc };
            if self.supported.contains(flag) { acc | (1 << (count - 1 - index)) } else { acc }
        });
        format!("{bits:x}.{count}.{}", self.version)
    }
}
