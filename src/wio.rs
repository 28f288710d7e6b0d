// src/wio.rs
use crate::config::{AppConfig, WIO_PID, WIO_VID};
use crate::types::{Capture, DeviceRef};
use log::warn;
use serialport::{ClearBuffer, SerialPortType};
use std::io::{BufRead, BufReader, ErrorKind};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("opening {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("no parseable data arrived within {0} ms")]
    SilentDevice(u64),
}

/// Scans the visible serial endpoints for the Wio Terminal's VID/PID pair.
///
/// Fails soft: an enumeration error or zero matches both yield `None`.
/// Several attached matches are tie-broken deterministically by port name,
/// with a warning naming the ignored ports.
pub fn locate_device() -> Option<DeviceRef> {
    let ports = serialport::available_ports().ok()?;
    let mut matches: Vec<String> = ports
        .into_iter()
        .filter(|port| match &port.port_type {
            SerialPortType::UsbPort(usb) => usb.vid == WIO_VID && usb.pid == WIO_PID,
            _ => false,
        })
        .map(|port| port.port_name)
        .collect();
    matches.sort();
    if matches.len() > 1 {
        warn!(
            "multiple Wio Terminals attached, using {} and ignoring {:?}",
            matches[0],
            &matches[1..]
        );
    }
    matches
        .into_iter()
        .next()
        .map(|port_name| DeviceRef { port_name })
}

/// Records one bounded capture from the device.
///
/// Lines are comma-separated ASCII, one integer timestamp followed by
/// `config.field_count` floats. The first accepted record's timestamp is the
/// capture's zero point; the record that first reaches
/// `config.capture_duration_ms` past it is excluded and ends the capture.
/// Malformed or partial lines are discarded without affecting the duration
/// clock. The whole call is additionally bounded by
/// `config.capture_wall_timeout_ms` of wall-clock time so a device that never
/// produces a parseable record cannot block forever.
///
/// The port handle lives only inside this call; it is dropped on every exit
/// path. Any non-timeout I/O error aborts the capture and discards whatever
/// was collected.
pub fn read_capture(device: &DeviceRef, config: &AppConfig) -> Result<Capture, CaptureError> {
    let port = serialport::new(&device.port_name, config.baud_rate)
        .timeout(Duration::from_millis(config.read_timeout_ms))
        .open()
        .map_err(|source| CaptureError::Open {
            port: device.port_name.clone(),
            source,
        })?;
    port.clear(ClearBuffer::Input)
        .map_err(|source| CaptureError::Open {
            port: device.port_name.clone(),
            source,
        })?;

    let mut reader = BufReader::new(port);
    let mut accumulator = CaptureAccumulator::new(config.capture_duration_ms);
    let mut line = String::new();
    let deadline = Instant::now() + Duration::from_millis(config.capture_wall_timeout_ms);

    while Instant::now() < deadline {
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let parsed = parse_record(line.trim_end(), config.field_count);
                line.clear();
                if let Some((timestamp, fields)) = parsed {
                    if accumulator.push(timestamp, fields) {
                        return Ok(accumulator.into_capture());
                    }
                }
            }
            // A per-read timeout is "no data yet", not a failure; partial
            // bytes stay buffered in `line` for the next read.
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(e) => return Err(CaptureError::Io(e)),
        }
    }

    if accumulator.started() {
        Ok(accumulator.into_capture())
    } else {
        Err(CaptureError::SilentDevice(config.capture_wall_timeout_ms))
    }
}

/// Splits one serial line into a timestamp and its float fields.
///
/// A line is accepted only if it has exactly `1 + field_count` comma-separated
/// pieces and every piece parses; anything else is discarded.
fn parse_record(line: &str, field_count: usize) -> Option<(i64, Vec<f64>)> {
    let pieces: Vec<&str> = line.split(',').collect();
    if pieces.len() != field_count + 1 {
        return None;
    }
    let timestamp: i64 = pieces[0].trim().parse().ok()?;
    let mut fields = Vec::with_capacity(field_count);
    for piece in &pieces[1..] {
        fields.push(piece.trim().parse::<f64>().ok()?);
    }
    Some((timestamp, fields))
}

/// Duration bookkeeping for one capture.
struct CaptureAccumulator {
    duration_ms: i64,
    zero: Option<i64>,
    rows: Vec<Vec<f64>>,
}

impl CaptureAccumulator {
    fn new(duration_ms: i64) -> Self {
        Self {
            duration_ms,
            zero: None,
            rows: Vec::new(),
        }
    }

    /// Returns true once the duration bound is reached; the record that
    /// reached it is excluded.
    fn push(&mut self, timestamp: i64, fields: Vec<f64>) -> bool {
        let zero = *self.zero.get_or_insert(timestamp);
        if timestamp - zero >= self.duration_ms {
            return true;
        }
        self.rows.push(fields);
        false
    }

    fn started(&self) -> bool {
        self.zero.is_some()
    }

    fn into_capture(self) -> Capture {
        Capture { rows: self.rows }
    }
}
