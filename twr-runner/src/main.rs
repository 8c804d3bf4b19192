//! # run-twr
//!
//! Run a FiRa two-way ranging session against a UCI radio on a serial port.
//!
//! Default profile: time-based scheduling; the controller side ranges as
//! initiator with MAC 0x0 towards 0x1, `--controlee` flips both. The default
//! session key (`--skey default`) is the engineering key hard-coded in EVB
//! firmware, standing in for an unavailable secure element.

mod stats;

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use uci_core::errno::{errno_for_error, errno_for_status, uqt_errmsg};
use uci_core::fira::app::AppParam;
use uci_core::fira::msg::{RangingData, RangingMeasurement};
use uci_core::fira::{FiraOps, Gid, OidRanging, SessionType};
use uci_core::qorvo::diag::RangingDiagData;
use uci_core::qorvo::{app as qorvo_app, OidQorvo};
use uci_core::tlv::ParamValue;
use uci_core::{Client, Status, UciError};

use stats::RangingStats;

const ENG_URSK_PREFIX: &str = "ed07a80d2beb00f785af2627";

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum RoundUsage {
    SsDeferred,
    DsDeferred,
    SsNonDeferred,
    DsNonDeferred,
}

impl RoundUsage {
    fn value(self) -> u64 {
        match self {
            Self::SsDeferred => 1,
            Self::DsDeferred => 2,
            Self::SsNonDeferred => 3,
            Self::DsNonDeferred => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum StsMode {
    Static,
    Provisioned,
    ProvisionedKey,
}

impl StsMode {
    fn value(self) -> u64 {
        match self {
            Self::Static => 0,
            Self::Provisioned => 3,
            Self::ProvisionedKey => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NodeMode {
    Unicast,
    Onetomany,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FrameConfig {
    Sp1,
    Sp3,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AoaReport {
    AllDisabled,
    AllEnabled,
    AzimuthOnly,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    Disabled,
    Enabled,
}

/// Run a FiRa two way ranging session.
#[derive(Debug, Parser)]
#[command(name = "run-twr", version)]
struct Opts {
    /// Communication port to use.
    #[arg(short, long, default_value_t = default_port())]
    port: String,
    /// Duration of the ranging session in seconds, -1 for forever.
    #[arg(short, long, default_value_t = 10)]
    time: i64,
    /// Use debug-level logging.
    #[arg(short, long)]
    verbose: bool,
    /// Session id to use.
    #[arg(short, long, default_value = "42")]
    session: String,
    /// CHANNEL_NUMBER value.
    #[arg(short, long, default_value_t = 9)]
    channel: u8,
    /// Configure as controlee (responder) instead of controller.
    #[arg(long)]
    controlee: bool,
    /// RANGING_ROUND_USAGE value.
    #[arg(long, value_enum, default_value_t = RoundUsage::DsDeferred)]
    round: RoundUsage,
    /// RANGING_ROUND_CONTROL value: integer or 'rrrm|cm|rcp|mrp|mrm' flags.
    #[arg(long)]
    round_ctrl: Option<String>,
    /// Set KEY_ROTATION to 1.
    #[arg(long)]
    en_key_rot: bool,
    /// KEY_ROTATION_RATE value.
    #[arg(long, default_value_t = 0)]
    key_rot_rate: u8,
    /// STS_CONFIG value.
    #[arg(long, value_enum, default_value_t = StsMode::Static)]
    sts: StsMode,
    /// SLOT_DURATION value in RSTU.
    #[arg(long, default_value_t = 2400)]
    slot_span: u16,
    /// MULTI_NODE_MODE value.
    #[arg(long, value_enum, default_value_t = NodeMode::Unicast)]
    node: NodeMode,
    /// RANGING_DURATION value in ms (previously RANGING_INTERVAL).
    #[arg(long, default_value_t = 200)]
    ranging_span: u32,
    /// Set the ENABLE_DIAGNOSTIC vendor parameter to 1.
    #[arg(long)]
    en_diag: bool,
    /// DIAGNOSTIC_FRAME_REPORTS_FIELD value: 'metrics|aoa|cir|cfo' flags.
    #[arg(long, default_value = "metrics|aoa|cfo")]
    diag_fields: String,
    /// MAX_NUMBER_OF_MEASUREMENTS value (0: unlimited).
    #[arg(long, default_value_t = 0)]
    meas_max: u16,
    /// SESSION_KEY 16 or 32 byte hex value; "default" for the eng key.
    #[arg(long)]
    skey: Option<String>,
    /// DEVICE_MAC_ADDRESS value. Default: 0x1 if controlee else 0x0.
    #[arg(long)]
    mac: Option<String>,
    /// DST_MAC_ADDRESS comma-separated list. Default mirrors --mac.
    #[arg(long)]
    dest_mac: Option<String>,
    /// RFRAME_CONFIG value.
    #[arg(long, value_enum, default_value_t = FrameConfig::Sp3)]
    frame: FrameConfig,
    /// SUB_SESSION_ID value.
    #[arg(long)]
    ssession: Option<String>,
    /// SUB_SESSION_KEY 16 or 32 byte hex value; "default" accepted.
    #[arg(long)]
    sskey: Option<String>,
    /// Set RSSI_REPORTING to 1.
    #[arg(long)]
    en_rssi: bool,
    /// Print a statistics report at the end of the run.
    #[arg(long)]
    stats: bool,
    /// Dump collected diagnostics to range_data_<date>_<time>.json
    /// (implies --en-diag and --stats).
    #[arg(long)]
    diag_dump: bool,
    /// NUMBER_OF_CONTROLEES for one-to-many ranging.
    #[arg(long, default_value_t = 1)]
    n_controlees: u8,
    /// BLOCK_STRIDE_LENGTH value.
    #[arg(long, default_value_t = 0)]
    block_stride_length: u8,
    /// STS segment length: 0 = 32, 1 = 64, 2 = 128 symbols.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2), default_value_t = 1)]
    sts_length: u8,
    /// VENDOR_ID value (used to generate the static STS).
    #[arg(long, default_value = "0x0708")]
    vendor_id: String,
    /// STATIC_STS_IV value.
    #[arg(long, default_value = "0x060504030201")]
    static_sts: String,
    /// AOA_RESULT_REQ value.
    #[arg(long, value_enum, default_value_t = AoaReport::AllEnabled)]
    aoa_report: AoaReport,
    /// PREAMBLE_CODE_INDEX value.
    #[arg(long, default_value_t = 10)]
    preamble_idx: u8,
    /// SFD_ID value.
    #[arg(long, default_value_t = 2)]
    sfd: u8,
    /// SLOTS_PER_RR value (slots in a ranging round).
    #[arg(long, default_value_t = 25)]
    slots_per_rr: u8,
    /// HOPPING_MODE value.
    #[arg(long, value_enum, default_value_t = Toggle::Disabled)]
    hopping_mode: Toggle,
}

fn default_port() -> String {
    std::env::var("UQT_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string())
}

fn parse_int(v: &str) -> Result<u64> {
    let v = v.trim();
    if let Some(hex) = v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).context("bad hexadecimal value")
    } else {
        v.parse().context("bad integer value")
    }
}

fn parse_flags(input: &str, mapping: &[(&str, u64)]) -> Result<u64> {
    if let Ok(v) = parse_int(input) {
        return Ok(v);
    }
    let mut flags = 0;
    for part in input.split('|') {
        let part = part.trim();
        let (_, bit) = mapping
            .iter()
            .find(|(name, _)| *name == part)
            .with_context(|| format!("unknown flag \"{part}\""))?;
        flags |= bit;
    }
    Ok(flags)
}

fn parse_key(input: &str, default_key: &str) -> Result<Vec<u8>> {
    let hex_str = if input == "default" { default_key } else { input };
    let key = hex::decode(hex_str).context("session key is not valid hex")?;
    if key.len() != 16 && key.len() != 32 {
        bail!("expected a 16 or 32 byte key, got {} bytes", key.len());
    }
    Ok(key)
}

struct Collected {
    range: mpsc::Receiver<RangingData>,
    diag: mpsc::Receiver<RangingDiagData>,
}

fn install_handlers(client: &Client) -> Collected {
    let (range_tx, range_rx) = mpsc::channel();
    client.set_notif_handler(
        Gid::Ranging.value(),
        OidRanging::Start.value(),
        "range-data",
        move |payload| match RangingData::decode(payload) {
            Ok(data) => {
                for m in &data.measurements {
                    match m {
                        RangingMeasurement::Twr(twr) => info!(
                            "ranging #{}: mac {:#06x} {} distance {} cm azimuth {:.1}° \
                             elevation {:.1}° rssi {:.1} dBm",
                            data.sequence_number,
                            twr.mac,
                            twr.status,
                            twr.distance_cm,
                            twr.aoa_azimuth,
                            twr.aoa_elevation,
                            twr.rssi_dbm,
                        ),
                        other => info!(
                            "ranging #{}: mac {:#06x} {}",
                            data.sequence_number,
                            other.mac(),
                            other.status()
                        ),
                    }
                }
                let _ = range_tx.send(data);
            }
            Err(e) => warn!("undecodable range data notification: {e}"),
        },
    );

    let (diag_tx, diag_rx) = mpsc::channel();
    client.set_notif_handler(
        Gid::Qorvo.value(),
        OidQorvo::TestDiag.value(),
        "range-diagnostics",
        move |payload| match RangingDiagData::decode(payload) {
            Ok(diag) => {
                info!(
                    "diagnostics #{}: {} reports",
                    diag.sequence_number,
                    diag.reports.len()
                );
                let _ = diag_tx.send(diag);
            }
            Err(e) => warn!("undecodable diagnostics notification: {e}"),
        },
    );

    client.set_default_notif_handler("log-unhandled", |gid, oid, payload| {
        info!("notif ({gid}, {oid}): {}", hex::encode(payload));
    });

    Collected {
        range: range_rx,
        diag: diag_rx,
    }
}

fn build_app_config(opts: &Opts, session: u32) -> Result<Vec<(AppParam, ParamValue)>> {
    let default_key = format!(
        "{ENG_URSK_PREFIX}{}",
        hex::encode(session.to_be_bytes())
    );
    let mac = match &opts.mac {
        Some(v) => parse_int(v)?,
        None => u64::from(opts.controlee),
    };
    let dest_macs: Vec<u64> = match &opts.dest_mac {
        Some(list) => list
            .split(',')
            .map(parse_int)
            .collect::<Result<_>>()?,
        None => vec![u64::from(!opts.controlee)],
    };

    let mut config: Vec<(AppParam, ParamValue)> = vec![
        (
            AppParam::DeviceType,
            ParamValue::Uint(u64::from(!opts.controlee)),
        ),
        (
            AppParam::DeviceRole,
            ParamValue::Uint(u64::from(!opts.controlee)),
        ),
        (AppParam::MultiNodeMode, ParamValue::Uint(opts.node as u64)),
        (
            AppParam::RangingRoundUsage,
            ParamValue::Uint(opts.round.value()),
        ),
        (AppParam::DeviceMacAddress, ParamValue::Uint(mac)),
        (AppParam::ChannelNumber, ParamValue::Uint(opts.channel as u64)),
        (AppParam::ScheduleMode, ParamValue::Uint(1)), // time scheduled
        (AppParam::StsConfig, ParamValue::Uint(opts.sts.value())),
        (
            AppParam::RframeConfig,
            ParamValue::Uint(match opts.frame {
                FrameConfig::Sp1 => 1,
                FrameConfig::Sp3 => 3,
            }),
        ),
        // tof | azimuth | fom
        (AppParam::ResultReportConfig, ParamValue::Uint(0x0B)),
        (
            AppParam::VendorId,
            ParamValue::Uint(parse_int(&opts.vendor_id)?),
        ),
        (
            AppParam::StaticStsIv,
            ParamValue::Uint(parse_int(&opts.static_sts)?),
        ),
        (
            AppParam::AoaResultReq,
            ParamValue::Uint(opts.aoa_report as u64),
        ),
        (AppParam::UwbInitiationTime, ParamValue::Uint(0)),
        (
            AppParam::PreambleCodeIndex,
            ParamValue::Uint(opts.preamble_idx as u64),
        ),
        (AppParam::SfdId, ParamValue::Uint(opts.sfd as u64)),
        (AppParam::SlotDuration, ParamValue::Uint(opts.slot_span as u64)),
        (
            AppParam::RangingInterval,
            ParamValue::Uint(opts.ranging_span as u64),
        ),
        (
            AppParam::SlotsPerRr,
            ParamValue::Uint(opts.slots_per_rr as u64),
        ),
        (
            AppParam::MaxNumberOfMeasurements,
            ParamValue::Uint(opts.meas_max as u64),
        ),
        (
            AppParam::HoppingMode,
            ParamValue::Uint(opts.hopping_mode as u64),
        ),
        (
            AppParam::RssiReporting,
            ParamValue::Uint(u64::from(opts.en_rssi)),
        ),
        (
            AppParam::BlockStrideLength,
            ParamValue::Uint(opts.block_stride_length as u64),
        ),
        (AppParam::StsLength, ParamValue::Uint(opts.sts_length as u64)),
        (
            AppParam::NumberOfControlees,
            ParamValue::Uint(opts.n_controlees as u64),
        ),
        (AppParam::DstMacAddress, ParamValue::List(dest_macs)),
    ];

    if let Some(ssession) = &opts.ssession {
        config.push((AppParam::SubSessionId, ParamValue::Uint(parse_int(ssession)?)));
    }
    if let Some(round_ctrl) = &opts.round_ctrl {
        let flags = parse_flags(
            round_ctrl,
            &[("rrrm", 1), ("cm", 2), ("rcp", 4), ("mrp", 64), ("mrm", 128)],
        )?;
        config.push((AppParam::RangingRoundControl, ParamValue::Uint(flags)));
    }
    if opts.en_key_rot {
        config.push((AppParam::KeyRotation, ParamValue::Uint(1)));
        config.push((
            AppParam::KeyRotationRate,
            ParamValue::Uint(opts.key_rot_rate as u64),
        ));
    }
    if opts.en_diag {
        let fields = parse_flags(
            &opts.diag_fields,
            &[("aoa", 0x02), ("cfo", 0x08), ("metrics", 0x20), ("cir", 0x40)],
        )?;
        config.push((qorvo_app::ENABLE_DIAGNOSTICS, ParamValue::Uint(1)));
        config.push((
            qorvo_app::DIAGS_FRAME_REPORTS_FIELDS,
            ParamValue::Uint(fields),
        ));
    }
    let needs_key = matches!(opts.sts, StsMode::Provisioned | StsMode::ProvisionedKey);
    if let Some(skey) = opts.skey.as_deref().or(needs_key.then_some("default")) {
        config.push((
            AppParam::SessionKey,
            ParamValue::Bytes(parse_key(skey, &default_key)?),
        ));
    }
    if let Some(sskey) = &opts.sskey {
        config.push((
            AppParam::SubSessionKey,
            ParamValue::Bytes(parse_key(sskey, &default_key)?),
        ));
    }
    Ok(config)
}

async fn run_session(client: &Client, opts: &Opts, session: u32) -> Result<Status, UciError> {
    info!("Initializing session {session}...");
    let (status, handle) = client.session_init(session, SessionType::Ranging).await?;
    if !status.is_ok() {
        warn!("session_init failed: {status}");
        return Ok(status);
    }
    let handle = match handle {
        Some(handle) => {
            info!("Using FiRa 2.0 session handle {handle}");
            handle
        }
        None => {
            info!("Using FiRa 1.3 (session handle == session id) {session}");
            session
        }
    };

    info!("Setting session {handle} config...");
    let config = match build_app_config(opts, session) {
        Ok(config) => config,
        Err(e) => {
            warn!("bad session configuration: {e:#}");
            let _ = client.session_deinit(handle).await;
            return Ok(Status::InvalidParam);
        }
    };
    for (param, value) in &config {
        info!("    {param:<32} {value:?}");
    }
    let (status, rejected) = client.session_set_app_config(handle, &config).await?;
    if !status.is_ok() {
        warn!("session_set_app_config failed: {status}, rejected: {rejected:?}");
        let _ = client.session_deinit(handle).await;
        return Ok(status);
    }

    info!("Starting ranging...");
    let status = client.ranging_start(handle).await?;
    if !status.is_ok() {
        warn!("ranging_start failed: {status}");
        let _ = client.session_deinit(handle).await;
        return Ok(status);
    }

    if opts.time < 0 {
        info!("Ranging until interrupted (press ctrl-c to stop)");
        let _ = tokio::signal::ctrl_c().await;
    } else {
        tokio::time::sleep(Duration::from_secs(opts.time as u64)).await;
    }

    info!("Stopping ranging...");
    let status = client.ranging_stop(handle).await?;
    if !status.is_ok() {
        warn!("ranging_stop failed: {status}");
        let _ = client.session_deinit(handle).await;
        return Ok(status);
    }

    info!("Deinitializing session...");
    let status = client.session_deinit(handle).await?;
    if !status.is_ok() {
        warn!("session_deinit failed: {status}");
    }
    Ok(status)
}

#[tokio::main]
async fn main() {
    let mut opts = Opts::parse();
    if opts.diag_dump {
        opts.en_diag = true;
        opts.stats = true;
    }

    let filter = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let session = match parse_int(&opts.session) {
        Ok(v) => v as u32,
        Err(e) => {
            warn!("bad session id \"{}\": {e:#}", opts.session);
            std::process::exit(2);
        }
    };

    let client = match Client::open(&opts.port).await {
        Ok(client) => client,
        Err(e) => {
            warn!("unable to open \"{}\": {e}", opts.port);
            std::process::exit(errno_for_error(&e) as i32);
        }
    };
    let collected = install_handlers(&client);

    let result = run_session(&client, &opts, session).await;
    let _ = client.close().await;

    let errno = match &result {
        Ok(status) => errno_for_status(*status),
        Err(e) => {
            warn!("{e}");
            errno_for_error(e)
        }
    };

    if opts.stats {
        let range: Vec<RangingData> = collected.range.try_iter().collect();
        let diag: Vec<RangingDiagData> = collected.diag.try_iter().collect();

        if opts.diag_dump && !diag.is_empty() {
            let name = format!(
                "range_data_{}.json",
                chrono::Local::now().format("%y-%m-%d-%Hh%Mm%Ss")
            );
            match std::fs::File::create(&name)
                .map_err(anyhow::Error::from)
                .and_then(|f| serde_json::to_writer_pretty(f, &diag).map_err(Into::into))
            {
                Ok(()) => info!("diagnostics dumped to {name}"),
                Err(e) => warn!("unable to dump diagnostics: {e:#}"),
            }
        }

        let stats = RangingStats::new(&range, &diag);
        println!("{stats}");
    }

    if errno == 0 {
        info!("Ok");
    } else {
        warn!("{}", uqt_errmsg(errno));
    }
    std::process::exit(errno as i32);
}
