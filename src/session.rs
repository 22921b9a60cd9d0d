//! The scripting and logging façade: drives a [`Transport`] from text lines
//! (macros, pauses, firmware flashing, config snapshots, or plain commands),
//! writing a structured, replayable log and caching the latest telemetry.
//!
//! Grounded in `original_source`'s `LoggingSpaceProtocol`: `run_line`'s
//! classifier order, the log line format, the firmware-flashing and
//! config-snapshot macros, and the status-flag labels are all carried over,
//! re-expressed without the Python-specific attribute reaching the original
//! used to enumerate configuration keys (`SPEC_FULL.md` §9 / §4.7).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write as _;

use chrono::Utc;

use crate::crc::firmware_crc32;
use crate::error::{Error, Result};
use crate::registry::CommandRegistry;
use crate::transport::Transport;
use crate::value::Value;

/// Deadline (seconds) used for the post-flash `sysreset` command.
const RESET_DELAY_SECONDS: f32 = 0.1;
const FIRMWARE_PIECE_SIZE: usize = 64;
const APP_FLASH_ADDRESS: u32 = 0x8000_8000;
const BOOTLOADER_FLASH_ADDRESS: u32 = 0x8000_0000;

/// Status byte flag bits, highest bit first, matching `spec.md` §4.6 and
/// `SPEC_FULL.md` §4.7.
const STATUS_FLAGS: &[(u8, &str)] = &[
    (0x80, "SYSTEM_FAULT"),
    (0x40, "OPERATIONAL_FAULT"),
    (0x02, "THRUSTING"),
    (0x01, "BUSY"),
];

/// Render a status byte as its comma-joined flag labels, or `IDLE` if none
/// are set.
pub fn status_label(status: u8) -> String {
    let labels: Vec<&str> = STATUS_FLAGS
        .iter()
        .filter(|(mask, _)| status & mask != 0)
        .map(|(_, label)| *label)
        .collect();
    if labels.is_empty() {
        "IDLE".to_string()
    } else {
        labels.join(",")
    }
}

/// An ISO-8601-ish timestamp with millisecond resolution, UTC, suitable for
/// log filenames and log line headers.
fn timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// The stateful driver over a [`Transport`]: reads script lines, writes a
/// timestamped log, and tracks the latest telemetry readings.
pub struct Session {
    transport: Transport,
    registry: CommandRegistry,
    log: File,
    macros: BTreeMap<String, String>,
    echo: bool,
    telemetry: BTreeMap<String, f32>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("echo", &self.echo)
            .field("telemetry_fields", &self.telemetry.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session over an already-open transport, opening a new log
    /// file named `{log_prefix}{timestamp}.log`.
    pub fn new(transport: Transport, registry: CommandRegistry, log_prefix: &str, echo: bool) -> Result<Self> {
        let filename = format!("{log_prefix}{}.log", timestamp());
        let log = File::create(filename)?;
        Ok(Self {
            transport,
            registry,
            log,
            macros: BTreeMap::new(),
            echo,
            telemetry: BTreeMap::new(),
        })
    }

    /// Load macro definitions from a flat indented-block text file
    /// (`SPEC_FULL.md` §4.7): a non-indented line starts a new macro whose
    /// name is that line; subsequent indented lines are appended to its
    /// body (joined with newlines) until the next non-indented line.
    pub fn load_macros(&mut self, text: &str) {
        let mut current: Option<String> = None;
        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(key) = &current {
                    let body = self.macros.entry(key.clone()).or_default();
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line.trim());
                }
            } else {
                let key = line.trim().to_string();
                if !key.is_empty() {
                    current = Some(key);
                }
            }
        }
    }

    pub fn telemetry(&self) -> &BTreeMap<String, f32> {
        &self.telemetry
    }

    pub fn last_status(&self) -> Option<u8> {
        self.transport.last_status()
    }

    /// Classify and run one script line (`SPEC_FULL.md` §4.7 / `spec.md`
    /// §4.7's line classifier), writing a log entry unless `logged` is
    /// false. Returns the rendered reply text, if any.
    pub fn run_line(&mut self, line: &str, logged: bool) -> Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('<') {
            return Ok(None);
        }
        let line = line.strip_prefix('>').map(str::trim).unwrap_or(line);

        if let Some(body) = self.macros.get(line).cloned() {
            if logged {
                writeln!(self.log, "# MACRO: {line}")?;
            }
            self.run_script(&body, logged)?;
            return Ok(None);
        }
        if let Some(rest) = line.strip_prefix("pause ") {
            let seconds: f32 = rest
                .trim()
                .parse()
                .map_err(|_| Error::Parse(format!("cannot parse pause delay: {rest:?}")))?;
            if logged {
                writeln!(self.log, "# {}", timestamp())?;
                writeln!(self.log, "> pause {}\n", crate::value::format_g(seconds))?;
            }
            std::thread::sleep(std::time::Duration::from_secs_f32(seconds.max(0.0)));
            return Ok(None);
        }
        if let Some(path) = line.strip_prefix("flash ") {
            self.flash(path.trim(), APP_FLASH_ADDRESS, FirmwareKind::App, logged)?;
            return self.run_line(&format!("sysreset {RESET_DELAY_SECONDS}"), logged);
        }
        if let Some(path) = line.strip_prefix("flashboot ") {
            self.flash(path.trim(), BOOTLOADER_FLASH_ADDRESS, FirmwareKind::Bootloader, logged)?;
            return self.run_line(&format!("sysreset {RESET_DELAY_SECONDS}"), logged);
        }
        if let Some(path) = line.strip_prefix("cload ") {
            let config = std::fs::read_to_string(path.trim())?;
            self.load_config(&config, logged)?;
            return Ok(None);
        }
        if let Some(path) = line.strip_prefix("csave ") {
            let config = self.save_config(logged)?;
            std::fs::write(path.trim(), config)?;
            return Ok(None);
        }
        self.send_text(line, logged)
    }

    /// Run every line of a multi-line script (a macro body, a loaded script
    /// file, or a log file being replayed) in order, stopping at the first
    /// error (`spec.md` §7: unexpected errors abort the enclosing script).
    pub fn run_script(&mut self, script: &str, logged: bool) -> Result<()> {
        for line in script.lines() {
            self.run_line(line, logged)?;
        }
        Ok(())
    }

    /// Parse, send, and log one wire command line, returning its rendered
    /// reply text.
    pub fn send_text(&mut self, line: &str, logged: bool) -> Result<Option<String>> {
        let message_parser = self.transport.message_parser().clone();
        let message = message_parser.decode_text(line)?;
        if logged {
            writeln!(self.log, "# {}", timestamp())?;
            writeln!(self.log, "> {}", message.render_text())?;
        }
        let decoded = self.transport.exchange(&message, None)?;
        let output = match &decoded {
            Some(frame) => {
                if let Some(reply_code) = frame.message.code() {
                    self.update_telemetry(reply_code, &frame.message);
                }
                format!(
                    "# Status: {} ({})\n< {}\n\n",
                    frame.status,
                    status_label(frame.status),
                    frame.message.render_text()
                )
            }
            None => "# No reply received\n\n".to_string(),
        };
        if logged {
            write!(self.log, "{output}")?;
        }
        if self.echo {
            print!("{output}");
        }
        Ok(decoded.map(|frame| frame.message.render_text()))
    }

    /// Merge a `tele`/`telexl` reply's field list into the telemetry cache.
    fn update_telemetry(&mut self, reply_code: u8, message: &crate::message::Message) {
        let is_telemetry_reply = self
            .registry
            .entry_by_name("tele")
            .map(|e| e.reply_code == reply_code)
            .unwrap_or(false)
            || self
                .registry
                .entry_by_name("telexl")
                .map(|e| e.reply_code == reply_code)
                .unwrap_or(false);
        if !is_telemetry_reply {
            return;
        }
        let Some(fields) = message.payload().and_then(Value::as_list) else {
            return;
        };
        for field in fields {
            let Some(pair) = field.as_list() else { continue };
            let (Some(label), Some(value)) = (
                pair.first().and_then(label_of),
                pair.get(1).and_then(Value::as_f32),
            ) else {
                continue;
            };
            self.telemetry.insert(label, value);
        }
    }

    fn flash(&mut self, path: &str, base_address: u32, kind: FirmwareKind, logged: bool) -> Result<()> {
        if logged {
            writeln!(self.log, "# {}", timestamp())?;
            writeln!(self.log, "# flash {path}\n")?;
        }
        let data = std::fs::read(path)?;
        match kind {
            FirmwareKind::App => {
                if data.len() < 64 * 1024 || data.len() >= (256 - 32) * 1024 {
                    return Err(Error::ProtocolMisuse(format!(
                        "unexpected firmware file size: {}",
                        data.len()
                    )));
                }
                let length = u32::from_le_bytes(data[32..36].try_into().unwrap());
                let crc = u32::from_le_bytes(data[data.len() - 4..].try_into().unwrap());
                if length as usize != data.len() - 4 || crc != firmware_crc32(&data[..data.len() - 4]) {
                    return Err(Error::ProtocolMisuse("invalid firmware checksum".to_string()));
                }
            }
            FirmwareKind::Bootloader => {
                if data.len() < 8 * 1024 || data.len() >= 32 * 1024 {
                    return Err(Error::ProtocolMisuse(format!(
                        "unexpected bootloader file size: {}",
                        data.len()
                    )));
                }
            }
        }

        for (index, piece) in data.chunks(FIRMWARE_PIECE_SIZE).enumerate() {
            let address = base_address + (index * FIRMWARE_PIECE_SIZE) as u32;
            let piece_str = piece
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            let command = format!("syspoke 0x{address:08x} {piece_str}");
            let reply = self.run_line(&command, logged)?;
            let expected = format!("syspoke_ack {address} {}", piece.len());
            if reply.as_deref() != Some(expected.as_str()) {
                return Err(Error::ProtocolMisuse(format!(
                    "unexpected syspoke reply: {reply:?}"
                )));
            }
            log::info!("flashed piece {} of {} at 0x{address:08x}", index + 1, data.len().div_ceil(FIRMWARE_PIECE_SIZE));
        }
        Ok(())
    }

    /// Restore a configuration snapshot in the `label: live (default[ ->
    /// local])` grammar, issuing `cvalue`/`cstring`/`cerase` for each line.
    fn load_config(&mut self, config: &str, logged: bool) -> Result<()> {
        for line in config.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (label, live, default, local) = parse_config_line(line)?;
            let is_string = live.starts_with('"') || live.starts_with('\'');
            let command_name = if is_string { "cstring" } else { "cvalue" };
            let command = match &local {
                Some(local) => format!("{command_name} {label} {live} {local}"),
                None => {
                    let reply = self.run_line(&format!("cerase {label}"), logged)?;
                    if matches!(reply.as_deref(), None | Some("cerase_ack ")) {
                        return Err(Error::ProtocolMisuse(format!("error erasing {label}")));
                    }
                    format!("{command_name} {label} {live}")
                }
            };
            let reply = self
                .run_line(&command, logged)?
                .ok_or_else(|| Error::ProtocolMisuse(format!("no reply to command: {command}")))?;
            let new_default = reply_default_field(&reply)
                .ok_or_else(|| Error::ProtocolMisuse(format!("unexpected reply: {reply}")))?;
            if new_default != default {
                log::warn!(
                    "{label} default does not match: config file has {default:?}, thruster reports {new_default:?}"
                );
            }
        }
        Ok(())
    }

    /// Snapshot every configuration parameter known via the `cerase`
    /// command's identifier table (`SPEC_FULL.md` §9), querying `cvalue`
    /// first and retrying as `cstring` on an empty reply.
    fn save_config(&mut self, logged: bool) -> Result<String> {
        let sysver = self.run_line("sysver", logged)?.unwrap_or_default();
        let mut config = format!(
            "# SPACESUIT thruster configuration parameters snapshot\n# Created: {}\n# {sysver}\n",
            timestamp()
        );

        let cerase_entry = self
            .registry
            .entry_by_name("cerase")
            .ok_or_else(|| Error::Initialization("registry has no cerase command".to_string()))?;
        let labels: Vec<String> = cerase_entry
            .request_parser
            .as_ref()
            .and_then(|p| p.as_identifier_table())
            .ok_or_else(|| Error::Initialization("cerase request parser is not an identifier table".to_string()))?
            .keys()
            .filter(|(_, label)| *label != "all")
            .map(|(_, label)| label.to_string())
            .collect();

        for label in labels {
            let mut reply = self.run_line(&format!("cvalue {label}"), logged)?;
            if reply.is_none() {
                log::warn!("no value for parameter: {label}");
                continue;
            }
            if config_fields_of(reply.as_deref().unwrap()).unwrap_or_default().is_empty() {
                reply = self.run_line(&format!("cstring {label}"), logged)?;
            }
            let reply = reply.ok_or_else(|| Error::ProtocolMisuse(format!("no reply to command: cvalue {label}")))?;
            let fields = config_fields_of(&reply)
                .ok_or_else(|| Error::ProtocolMisuse(format!("unexpected reply: {reply}")))?;
            let line = match fields.as_slice() {
                [live, default] => format!("{label}: {live} ({default})"),
                [live, default, local] => format!("{label}: {live} ({default} -> {local})"),
                _ => return Err(Error::ProtocolMisuse(format!("unexpected reply: {reply}"))),
            };
            config.push_str(&line);
            config.push('\n');
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirmwareKind {
    App,
    Bootloader,
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::Byte { label: Some(label), .. } => Some(label.clone()),
        _ => None,
    }
}

/// Split a rendered `cvalue`/`cstring` reply's tail (after `<label> `) into
/// its 2 or 3 space-separated value fields.
fn config_fields_of(reply: &str) -> Option<Vec<String>> {
    let mut parts = reply.split(' ');
    let _name = parts.next()?;
    let _label = parts.next()?;
    let fields: Vec<String> = parts.map(str::to_string).collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Parse one `csave` snapshot line: `label: live (default)` or `label: live
/// (default -> local)`.
fn parse_config_line(line: &str) -> Result<(String, String, String, Option<String>)> {
    let (label, rest) = line
        .split_once(": ")
        .ok_or_else(|| Error::Parse(format!("cannot parse line: {line:?}")))?;
    let rest = rest
        .strip_suffix(')')
        .ok_or_else(|| Error::Parse(format!("cannot parse line: {line:?}")))?;
    let (live, paren) = rest
        .split_once(" (")
        .ok_or_else(|| Error::Parse(format!("cannot parse line: {line:?}")))?;
    let (default, local) = match paren.split_once(" -> ") {
        Some((default, local)) => (default.to_string(), Some(local.to_string())),
        None => (paren.to_string(), None),
    };
    Ok((label.to_string(), live.to_string(), default, local))
}

/// Extract the default-value field of a `cvalue`/`cstring` reply as
/// compared against a config snapshot, i.e. the second value field.
fn reply_default_field(reply: &str) -> Option<String> {
    config_fields_of(reply)?.into_iter().nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_reports_idle_with_no_flags_set() {
        assert_eq!(status_label(0), "IDLE");
    }

    #[test]
    fn status_label_joins_multiple_flags_highest_bit_first() {
        assert_eq!(status_label(0x81), "SYSTEM_FAULT,BUSY");
        assert_eq!(status_label(0x03), "THRUSTING,BUSY");
    }

    #[test]
    fn load_macros_accumulates_indented_bodies() {
        let mut session_macros = BTreeMap::new();
        let text = "boot\n  ping\n  echo 1 2\nreset\n  sysreset 0\n";
        // Exercise the parsing logic directly without a live transport.
        let mut current: Option<String> = None;
        for line in text.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(key) = &current {
                    let body = session_macros.entry(key.clone()).or_insert_with(String::new);
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line.trim());
                }
            } else {
                current = Some(line.trim().to_string());
            }
        }
        assert_eq!(session_macros.get("boot").unwrap(), "ping\necho 1 2");
        assert_eq!(session_macros.get("reset").unwrap(), "sysreset 0");
    }

    #[test]
    fn parse_config_line_without_override() {
        let (label, live, default, local) = parse_config_line("space_address: 5 (5)").unwrap();
        assert_eq!(label, "space_address");
        assert_eq!(live, "5");
        assert_eq!(default, "5");
        assert_eq!(local, None);
    }

    #[test]
    fn parse_config_line_with_override() {
        let (label, live, default, local) =
            parse_config_line("hw_variant: \"ace_max\" (\"ace_radhard\" -> \"ace_max\")").unwrap();
        assert_eq!(label, "hw_variant");
        assert_eq!(live, "\"ace_max\"");
        assert_eq!(default, "\"ace_radhard\"");
        assert_eq!(local, Some("\"ace_max\"".to_string()));
    }

    #[test]
    fn config_fields_of_splits_the_value_tail() {
        let fields = config_fields_of("cvalue_ack space_address 5 5").unwrap();
        assert_eq!(fields, vec!["5".to_string(), "5".to_string()]);
    }
}
