//! Qorvo extensions to the FiRa session and test parameter tables.

use crate::error::Result;
use crate::fira::app::{AppParam, TestParam, APP_CONFIG, TEST_CONFIG};
use crate::registry::RegistryBuilder;
use crate::tlv::LengthPolicy;

// Vendor APP_CONFIG tags, reachable through `AppParam::Unknown` plus the
// registered display names below.
pub const NB_OF_RANGE_MEASUREMENTS: AppParam = AppParam::Unknown(0xE3);
pub const NB_OF_AZIMUTH_MEASUREMENTS: AppParam = AppParam::Unknown(0xE4);
pub const NB_OF_ELEVATION_MEASUREMENTS: AppParam = AppParam::Unknown(0xE5);
pub const RX_ANTENNA_SELECTION: AppParam = AppParam::Unknown(0xE6);
pub const TX_ANTENNA_SELECTION: AppParam = AppParam::Unknown(0xE7);
pub const ENABLE_DIAGNOSTICS: AppParam = AppParam::Unknown(0xE8);
pub const DIAGS_FRAME_REPORTS_FIELDS: AppParam = AppParam::Unknown(0xE9);

/// Vendor TEST_CONFIG tag.
pub const RSSI_OUTLIERS: TestParam = TestParam::Unknown(0xEB);

pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    let names: &[(&str, AppParam, LengthPolicy)] = &[
        ("NbOfRangeMeasurements", NB_OF_RANGE_MEASUREMENTS, LengthPolicy::Fixed(1)),
        ("NbOfAzimuthMeasurements", NB_OF_AZIMUTH_MEASUREMENTS, LengthPolicy::Fixed(1)),
        ("NbOfElevationMeasurements", NB_OF_ELEVATION_MEASUREMENTS, LengthPolicy::Var),
        ("RxAntennaSelection", RX_ANTENNA_SELECTION, LengthPolicy::Fixed(1)),
        ("TxAntennaSelection", TX_ANTENNA_SELECTION, LengthPolicy::Fixed(1)),
        ("EnableDiagnostics", ENABLE_DIAGNOSTICS, LengthPolicy::Fixed(1)),
        ("DiagsFrameReportsFields", DIAGS_FRAME_REPORTS_FIELDS, LengthPolicy::Fixed(1)),
    ];
    for (name, param, policy) in names {
        builder.extend_enum(AppParam::NAME, name, param.value())?;
        builder.table_mut(APP_CONFIG)?.insert(param.value(), policy.clone());
    }

    builder.extend_enum(TestParam::NAME, "RssiOutliers", RSSI_OUTLIERS.value())?;
    builder
        .table_mut(TEST_CONFIG)?
        .insert(RSSI_OUTLIERS.value(), LengthPolicy::Fixed(2));
    Ok(())
}
