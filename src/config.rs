use crate::power::{PowerSettings, DEFAULT_AMPS_PER_LED};
use crate::schedule::SleepSchedule;
use chrono::NaiveTime;
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level daemon configuration. All fields are Options so YAML and CLI
/// can be layered over the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,          // "info" | "debug" | ...
    /// Path of the persisted layout document (JSON).
    pub layout_path: Option<PathBuf>,
    pub display: Option<DisplayConfig>,
    pub power: Option<PowerConfig>,
    pub ingress: Option<IngressConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub driver: Option<DriverConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub target_fps: Option<u32>,
    pub brightness: Option<u8>, // 0-255
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PowerConfig {
    pub enabled: Option<bool>,
    pub ceiling_amps: Option<f64>,
    pub amps_per_led: Option<f64>,
    pub idle_amps_per_led: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngressConfig {
    /// 0 disables the UDP listener.
    pub udp_port: Option<u16>,
    /// Empty path disables the pipe reader.
    pub pipe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    pub enabled: Option<bool>,
    pub off: Option<String>, // "23:00"
    pub on: Option<String>,  // "07:00"
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverConfig {
    pub kind: Option<DriverKind>,
    pub spi_bus: Option<String>, // e.g. "/dev/spidev0.0"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Mock,
    Ws2812Spi,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "lumigrid", about = "LED panel grid display daemon", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Layout document to load at startup
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub layout: Option<PathBuf>,
    #[arg(long)]
    pub fps: Option<u32>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long)]
    pub udp_port: Option<u16>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub pipe: Option<PathBuf>,
    /// Drive the mock chain instead of hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub mock: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    load_with(&cli)
}

pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lumigrid/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lumigrid/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lumigrid.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lumigrid.yaml", "config.yaml", "config/lumigrid.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()   { dst.log_level = src.log_level; }
    if src.layout_path.is_some() { dst.layout_path = src.layout_path; }
    merge_section(&mut dst.display, src.display, merge_display);
    merge_section(&mut dst.power, src.power, merge_power);
    merge_section(&mut dst.ingress, src.ingress, merge_ingress);
    merge_section(&mut dst.schedule, src.schedule, merge_schedule);
    merge_section(&mut dst.driver, src.driver, merge_driver);
}

fn merge_section<T>(dst: &mut Option<T>, src: Option<T>, merge_inner: fn(&mut T, T)) {
    match (dst.as_mut(), src) {
        (None, Some(s)) => *dst = Some(s),
        (Some(d), Some(s)) => merge_inner(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.target_fps.is_some() { dst.target_fps = src.target_fps; }
    if src.brightness.is_some() { dst.brightness = src.brightness; }
}

fn merge_power(dst: &mut PowerConfig, src: PowerConfig) {
    if src.enabled.is_some()           { dst.enabled = src.enabled; }
    if src.ceiling_amps.is_some()      { dst.ceiling_amps = src.ceiling_amps; }
    if src.amps_per_led.is_some()      { dst.amps_per_led = src.amps_per_led; }
    if src.idle_amps_per_led.is_some() { dst.idle_amps_per_led = src.idle_amps_per_led; }
}

fn merge_ingress(dst: &mut IngressConfig, src: IngressConfig) {
    if src.udp_port.is_some()  { dst.udp_port = src.udp_port; }
    if src.pipe_path.is_some() { dst.pipe_path = src.pipe_path; }
}

fn merge_schedule(dst: &mut ScheduleConfig, src: ScheduleConfig) {
    if src.enabled.is_some() { dst.enabled = src.enabled; }
    if src.off.is_some()     { dst.off = src.off; }
    if src.on.is_some()      { dst.on = src.on; }
}

fn merge_driver(dst: &mut DriverConfig, src: DriverConfig) {
    if src.kind.is_some()    { dst.kind = src.kind; }
    if src.spi_bus.is_some() { dst.spi_bus = src.spi_bus; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.layout.is_some()    { cfg.layout_path = cli.layout.clone(); }

    if cli.fps.is_some() || cli.brightness.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.fps.is_some()        { display.target_fps = cli.fps; }
        if cli.brightness.is_some() { display.brightness = cli.brightness; }
    }

    if cli.udp_port.is_some() || cli.pipe.is_some() {
        let ingress = cfg.ingress.get_or_insert_with(IngressConfig::default);
        if cli.udp_port.is_some() { ingress.udp_port = cli.udp_port; }
        if cli.pipe.is_some()     { ingress.pipe_path = cli.pipe.clone(); }
    }

    if cli.mock {
        cfg.driver.get_or_insert_with(DriverConfig::default).kind = Some(DriverKind::Mock);
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ConfigError::Validation(format!("bad schedule time \"{}\"", s)))
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if let Some(fps) = display.target_fps {
            if fps == 0 || fps > 240 {
                return Err(ConfigError::Validation("display target_fps must be 1..=240".into()));
            }
        }
    }
    if let Some(power) = cfg.power.as_ref() {
        for (name, v) in [
            ("ceiling_amps", power.ceiling_amps),
            ("amps_per_led", power.amps_per_led),
        ] {
            if let Some(v) = v {
                if !(v > 0.0) {
                    return Err(ConfigError::Validation(format!("power {} must be > 0", name)));
                }
            }
        }
        if let Some(idle) = power.idle_amps_per_led {
            if idle < 0.0 {
                return Err(ConfigError::Validation("power idle_amps_per_led must be >= 0".into()));
            }
        }
    }
    if let Some(schedule) = cfg.schedule.as_ref() {
        if let Some(off) = schedule.off.as_ref() { parse_time(off)?; }
        if let Some(on) = schedule.on.as_ref() { parse_time(on)?; }
    }
    Ok(())
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn layout_path(&self) -> PathBuf {
        self.layout_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("configs/layout.json"))
    }

    pub fn target_fps(&self) -> u32 {
        self.display
            .as_ref()
            .and_then(|d| d.target_fps)
            .unwrap_or(30)
    }

    pub fn brightness(&self) -> u8 {
        self.display
            .as_ref()
            .and_then(|d| d.brightness)
            .unwrap_or(128)
    }

    pub fn power_settings(&self) -> PowerSettings {
        let p = self.power.clone().unwrap_or_default();
        PowerSettings {
            enabled: p.enabled.unwrap_or(true),
            ceiling_amps: p.ceiling_amps.unwrap_or(8.5),
            amps_per_led: p.amps_per_led.unwrap_or(DEFAULT_AMPS_PER_LED),
            idle_amps_per_led: p.idle_amps_per_led.unwrap_or(0.0),
        }
    }

    pub fn udp_port(&self) -> u16 {
        self.ingress
            .as_ref()
            .and_then(|i| i.udp_port)
            .unwrap_or(5555)
    }

    pub fn pipe_path(&self) -> Option<PathBuf> {
        let path = self
            .ingress
            .as_ref()
            .and_then(|i| i.pipe_path.clone())
            .unwrap_or_else(|| PathBuf::from("/tmp/led_frames.pipe"));
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Validated by `load`, so parse failures cannot reach here in the
    /// daemon; kept fallible for direct library use.
    pub fn sleep_schedule(&self) -> Result<SleepSchedule, ConfigError> {
        let s = self.schedule.clone().unwrap_or_default();
        let mut schedule = SleepSchedule::disabled();
        schedule.enabled = s.enabled.unwrap_or(false);
        if let Some(off) = s.off.as_ref() {
            schedule.off = parse_time(off)?;
        }
        if let Some(on) = s.on.as_ref() {
            schedule.on = parse_time(on)?;
        }
        Ok(schedule)
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver
            .as_ref()
            .and_then(|d| d.kind)
            .unwrap_or(DriverKind::Ws2812Spi)
    }

    pub fn spi_bus(&self) -> String {
        self.driver
            .as_ref()
            .and_then(|d| d.spi_bus.clone())
            .unwrap_or_else(|| "/dev/spidev0.0".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.target_fps(), 30);
        assert_eq!(cfg.brightness(), 128);
        assert_eq!(cfg.udp_port(), 5555);
        assert_eq!(cfg.driver_kind(), DriverKind::Ws2812Spi);
        assert!(cfg.pipe_path().is_some());
        assert!(!cfg.sleep_schedule().unwrap().enabled);
    }

    #[test]
    fn test_yaml_merge_over_defaults() {
        let yaml = r#"
log_level: debug
display:
  target_fps: 60
power:
  ceiling_amps: 4.5
schedule:
  enabled: true
  off: "22:30"
  on: "06:00"
"#;
        let src: Config = serde_yaml::from_str(yaml).unwrap();
        let mut cfg = Config::default();
        merge(&mut cfg, src);
        validate(&cfg).unwrap();

        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.target_fps(), 60);
        assert_eq!(cfg.brightness(), 128); // untouched default
        assert_eq!(cfg.power_settings().ceiling_amps, 4.5);

        let schedule = cfg.sleep_schedule().unwrap();
        assert!(schedule.enabled);
        assert_eq!(schedule.off, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
    }

    #[test]
    fn test_validation_rejects_zero_fps() {
        let cfg = Config {
            display: Some(DisplayConfig { target_fps: Some(0), brightness: None }),
            ..Default::default()
        };
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_bad_schedule_time() {
        let cfg = Config {
            schedule: Some(ScheduleConfig {
                enabled: Some(true),
                off: Some("25:99".into()),
                on: None,
            }),
            ..Default::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_empty_pipe_path_disables_pipe() {
        let cfg = Config {
            ingress: Some(IngressConfig {
                udp_port: None,
                pipe_path: Some(PathBuf::new()),
            }),
            ..Default::default()
        };
        assert!(cfg.pipe_path().is_none());
    }

    #[test]
    fn test_mock_flag_overrides_driver() {
        let cli = Cli {
            config: None,
            log_level: None,
            layout: None,
            fps: Some(45),
            brightness: None,
            udp_port: None,
            pipe: None,
            mock: true,
            dump_config: false,
        };
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.driver_kind(), DriverKind::Mock);
        assert_eq!(cfg.target_fps(), 45);
    }
}
