// THEORY:
// The `control` module is the inbound command surface. A UI, a console or a
// test harness speaks a small line-oriented vocabulary, and each line maps to
// exactly one library operation:
//
//     start | stop
//     select <color> | select none
//     set <color> <lower|upper> <h|s|v> <value>
//     save | load
//     query <color>
//     capture <path>
//     status
//
// A `ControlSession` bundles the service, the calibration store and the
// outbound transport so that `query` can run the full read -> encode -> send
// path. Transport failures are returned to the caller; the worker never sees
// them.

use crate::core_modules::calibration_store::CalibrationStore;
use crate::core_modules::color_profile::{Bound, Bounds};
use crate::core_modules::command_encoder::{encode, encode_to_string};
use crate::core_modules::overlay::{self, OverlayOptions};
use crate::core_modules::pixel::{Byte, Channel};
use crate::core_modules::transport::Transport;
use crate::error::{Result, VisionError};
use crate::pipeline::ZoneResult;
use crate::service::{ServiceState, VisionService};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// One parsed control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Select(Option<String>),
    SetThreshold {
        color: String,
        bound: Bound,
        channel: Channel,
        value: Byte,
    },
    Save,
    Load,
    Query(String),
    Capture(PathBuf),
    Status,
}

fn invalid(message: impl Into<String>) -> VisionError {
    VisionError::InvalidCommand(message.into())
}

impl FromStr for ControlCommand {
    type Err = VisionError;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = words.split_first() else {
            return Err(invalid("empty command"));
        };

        let command = match (verb.to_ascii_lowercase().as_str(), args) {
            ("start", []) => ControlCommand::Start,
            ("stop", []) => ControlCommand::Stop,
            ("select", [name]) if name.eq_ignore_ascii_case("none") => ControlCommand::Select(None),
            ("select", [name]) => ControlCommand::Select(Some(name.to_string())),
            ("set", [color, bound, channel, value]) => ControlCommand::SetThreshold {
                color: color.to_string(),
                bound: bound.parse().map_err(invalid)?,
                channel: channel.parse().map_err(invalid)?,
                value: value
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not a channel value (0-255)")))?,
            },
            ("save", []) => ControlCommand::Save,
            ("load", []) => ControlCommand::Load,
            ("query", [color]) => ControlCommand::Query(color.to_string()),
            ("capture", [path]) => ControlCommand::Capture(PathBuf::from(path)),
            ("status", []) => ControlCommand::Status,
            (verb, args) => {
                return Err(invalid(format!(
                    "'{verb}' with {} argument(s) is not a known command",
                    args.len()
                )));
            }
        };
        Ok(command)
    }
}

/// The outcome of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    State(ServiceState),
    Selected(Option<String>),
    Threshold {
        color: String,
        lower: Bounds,
        upper: Bounds,
    },
    Saved(PathBuf),
    Loaded {
        rejected: usize,
        ignored: usize,
    },
    /// Zones for a color, plus the exact payload handed to the transport.
    Zones {
        color: String,
        zones: ZoneResult,
        message: String,
    },
    Captured(PathBuf),
    Status {
        state: ServiceState,
        frames_processed: u64,
        active_color: Option<String>,
        zones: BTreeMap<String, ZoneResult>,
    },
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlReply::State(state) => write!(f, "{state}"),
            ControlReply::Selected(None) => write!(f, "detecting all colors"),
            ControlReply::Selected(Some(color)) => write!(f, "previewing {color}"),
            ControlReply::Threshold { color, lower, upper } => {
                write!(f, "{color}: lower={lower:?} upper={upper:?}")
            }
            ControlReply::Saved(path) => write!(f, "saved {}", path.display()),
            ControlReply::Loaded { rejected, ignored } => {
                write!(f, "loaded ({rejected} rejected, {ignored} ignored)")
            }
            ControlReply::Zones { color, message, .. } => write!(f, "{color}: '{message}'"),
            ControlReply::Captured(path) => write!(f, "captured {}", path.display()),
            ControlReply::Status {
                state,
                frames_processed,
                active_color,
                zones,
            } => {
                write!(f, "{state}, {frames_processed} frames")?;
                if let Some(color) = active_color {
                    write!(f, ", previewing {color}")?;
                }
                for (color, zones) in zones {
                    write!(f, ", {color}=[{}]", encode_to_string(zones))?;
                }
                Ok(())
            }
        }
    }
}

/// Executes control commands against one service.
pub struct ControlSession<T> {
    service: VisionService,
    store: CalibrationStore,
    transport: T,
    overlay: OverlayOptions,
}

impl<T: Transport> ControlSession<T> {
    pub fn new(service: VisionService, store: CalibrationStore, transport: T) -> Self {
        Self {
            service,
            store,
            transport,
            overlay: OverlayOptions::default(),
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayOptions) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn service(&self) -> &VisionService {
        &self.service
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Parses and executes one line.
    pub fn execute_line(&mut self, line: &str) -> Result<ControlReply> {
        let command = line.parse()?;
        self.execute(command)
    }

    pub fn execute(&mut self, command: ControlCommand) -> Result<ControlReply> {
        let pipeline = self.service.pipeline().clone();
        match command {
            ControlCommand::Start => {
                self.service.start()?;
                Ok(ControlReply::State(self.service.state()))
            }
            ControlCommand::Stop => {
                self.service.stop();
                Ok(ControlReply::State(self.service.state()))
            }
            ControlCommand::Select(color) => {
                pipeline.set_active_color(color.as_deref())?;
                Ok(ControlReply::Selected(color))
            }
            ControlCommand::SetThreshold {
                color,
                bound,
                channel,
                value,
            } => {
                let profile = pipeline.set_threshold(&color, bound, channel, value)?;
                Ok(ControlReply::Threshold {
                    color,
                    lower: profile.lower(),
                    upper: profile.upper(),
                })
            }
            ControlCommand::Save => {
                self.store.save(&pipeline.calibration())?;
                Ok(ControlReply::Saved(self.store.path().to_path_buf()))
            }
            ControlCommand::Load => {
                let report = self.store.load();
                let reply = ControlReply::Loaded {
                    rejected: report.rejected.len(),
                    ignored: report.ignored.len(),
                };
                pipeline.replace_calibration(report.set);
                Ok(reply)
            }
            ControlCommand::Query(color) => {
                let zones = pipeline.query(&color)?;
                let payload = encode(&zones);
                if let Err(e) = self.transport.send(&payload) {
                    warn!(color = %color, error = %e, "zone message not delivered");
                    return Err(VisionError::TransportWriteFailure(e));
                }
                Ok(ControlReply::Zones {
                    message: encode_to_string(&zones),
                    color,
                    zones,
                })
            }
            ControlCommand::Capture(path) => {
                let snapshot = pipeline.snapshot();
                let calibration = pipeline.calibration();
                let image = overlay::render(&snapshot, &calibration, &self.overlay)
                    .ok_or_else(|| invalid("capture: no frame has been processed yet"))?;
                image.save(&path)?;
                info!(path = %path.display(), sequence = snapshot.sequence, "overlay captured");
                Ok(ControlReply::Captured(path))
            }
            ControlCommand::Status => {
                let snapshot = pipeline.snapshot();
                let zones = snapshot
                    .detections
                    .iter()
                    .map(|(color, d)| (color.clone(), d.zones.clone()))
                    .collect();
                Ok(ControlReply::Status {
                    state: self.service.state(),
                    frames_processed: self.service.frames_processed(),
                    active_color: pipeline.active_color(),
                    zones,
                })
            }
        }
    }

    /// Stops the service and returns the transport.
    pub fn into_transport(mut self) -> T {
        self.service.stop();
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_vocabulary() {
        assert_eq!("start".parse::<ControlCommand>().unwrap(), ControlCommand::Start);
        assert_eq!(" STOP ".parse::<ControlCommand>().unwrap(), ControlCommand::Stop);
        assert_eq!(
            "select Red".parse::<ControlCommand>().unwrap(),
            ControlCommand::Select(Some("Red".into()))
        );
        assert_eq!(
            "select none".parse::<ControlCommand>().unwrap(),
            ControlCommand::Select(None)
        );
        assert_eq!(
            "set Blue upper s 200".parse::<ControlCommand>().unwrap(),
            ControlCommand::SetThreshold {
                color: "Blue".into(),
                bound: Bound::Upper,
                channel: Channel::Saturation,
                value: 200,
            }
        );
        assert_eq!("save".parse::<ControlCommand>().unwrap(), ControlCommand::Save);
        assert_eq!("load".parse::<ControlCommand>().unwrap(), ControlCommand::Load);
        assert_eq!(
            "query Yellow".parse::<ControlCommand>().unwrap(),
            ControlCommand::Query("Yellow".into())
        );
        assert_eq!(
            "capture out.png".parse::<ControlCommand>().unwrap(),
            ControlCommand::Capture(PathBuf::from("out.png"))
        );
        assert_eq!("status".parse::<ControlCommand>().unwrap(), ControlCommand::Status);
    }

    #[test]
    fn malformed_lines_are_invalid_commands() {
        let malformed = [
            "",
            "launch",
            "query",
            "set Red lower h",
            "set Red middle h 3",
            "set Red lower q 3",
            "set Red lower h 300",
        ];
        for line in malformed {
            assert!(
                matches!(line.parse::<ControlCommand>(), Err(VisionError::InvalidCommand(_))),
                "{line:?}"
            );
        }
    }

    #[test]
    fn status_lists_zones_in_wire_form() {
        let reply = ControlReply::Status {
            state: ServiceState::Running,
            frames_processed: 12,
            active_color: None,
            zones: BTreeMap::from([("Green".to_string(), vec![]), ("Red".to_string(), vec![0, 2])]),
        };
        assert_eq!(reply.to_string(), "running, 12 frames, Green=[], Red=[0,2]");
    }
}
