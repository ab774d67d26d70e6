use serde::{Deserialize, Serialize};
use shared::types::{BuildMode, DeviceKind, EnvironmentClass};
use crate::config::EnvironmentOverrides;

/// Set when the process runs inside an emulator image
pub const EMULATOR_ENV: &str = "PARITY_EMULATOR";

/// Set by the development sandbox that hosts the app on a physical device
pub const DEV_WRAPPER_ENV: &str = "PARITY_DEV_WRAPPER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
    Desktop,
    Unknown,
}

impl Platform {
    /// Platform of the running binary, from compile-time target metadata.
    pub fn current() -> Self {
        if cfg!(target_family = "wasm") {
            return Platform::Web;
        }
        match std::env::consts::OS {
            "android" => Platform::Android,
            "ios" => Platform::Ios,
            "linux" | "macos" | "windows" | "freebsd" => Platform::Desktop,
            _ => Platform::Unknown,
        }
    }
}

/// Raw signals the classification is derived from. Any of them may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeSignals {
    pub platform: Option<Platform>,
    pub emulator: Option<bool>,
    pub dev_wrapper: Option<bool>,
    pub debug: Option<bool>,
}

impl RuntimeSignals {
    /// Reads in-process metadata only: target info, build flags, environment variables.
    pub fn from_process() -> Self {
        Self {
            platform: Some(Platform::current()),
            emulator: env_flag(EMULATOR_ENV),
            dev_wrapper: env_flag(DEV_WRAPPER_ENV),
            debug: Some(cfg!(debug_assertions)),
        }
    }

    pub fn with_overrides(mut self, overrides: &EnvironmentOverrides) -> Self {
        if overrides.platform.is_some() {
            self.platform = overrides.platform;
        }
        if overrides.emulator.is_some() {
            self.emulator = overrides.emulator;
        }
        if overrides.dev_wrapper.is_some() {
            self.dev_wrapper = overrides.dev_wrapper;
        }
        if overrides.debug.is_some() {
            self.debug = overrides.debug;
        }
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Classify a set of signals. Conflicts resolve by priority:
/// browser platform, then dev wrapper, then emulator hint, then a debug
/// Android build known to run without a wrapper. Everything else is a
/// physical device, and a missing build flag means release.
pub fn classify_signals(signals: &RuntimeSignals) -> EnvironmentClass {
    let build = match signals.debug {
        Some(true) => BuildMode::Debug,
        _ => BuildMode::Release,
    };

    let device = match signals.platform {
        Some(Platform::Web) => DeviceKind::Browser,
        _ if signals.dev_wrapper == Some(true) => DeviceKind::PhysicalDevice,
        _ if signals.emulator == Some(true) => DeviceKind::Emulator,
        Some(Platform::Android)
            if build == BuildMode::Debug && signals.dev_wrapper == Some(false) =>
        {
            DeviceKind::Emulator
        }
        _ => DeviceKind::PhysicalDevice,
    };

    EnvironmentClass::new(device, build)
}

pub trait EnvironmentDetector: Send + Sync {
    /// Must not block or perform I/O.
    fn classify(&self) -> EnvironmentClass;

    fn signals(&self) -> RuntimeSignals {
        RuntimeSignals::default()
    }
}

/// Detector for the running process. Signals are captured once at construction.
#[derive(Debug, Clone)]
pub struct RuntimeDetector {
    signals: RuntimeSignals,
}

impl RuntimeDetector {
    pub fn new(overrides: &EnvironmentOverrides) -> Self {
        Self::from_signals(RuntimeSignals::from_process().with_overrides(overrides))
    }

    pub fn from_signals(signals: RuntimeSignals) -> Self {
        Self { signals }
    }
}

impl EnvironmentDetector for RuntimeDetector {
    fn classify(&self) -> EnvironmentClass {
        classify_signals(&self.signals)
    }

    fn signals(&self) -> RuntimeSignals {
        self.signals
    }
}

/// Fixed classification, for tests and for hosts that know their context.
#[derive(Debug, Clone, Copy)]
pub struct StaticDetector(pub EnvironmentClass);

impl EnvironmentDetector for StaticDetector {
    fn classify(&self) -> EnvironmentClass {
        self.0
    }
}
