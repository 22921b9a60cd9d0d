//! SPP protocol definitions common to all ACE thrusters, transcribed from
//! `ace_common.py`/`ace_radhard.py` (ACE Rad-Hard adds nothing of its own).

use std::sync::Arc;

use crate::error::Result;
use crate::ident::IdentifierTable;
use crate::parser::{Parser, ParserRef};
use crate::registry::CommandRegistry;
use crate::value::IntWidth;

/// Wrap a `first`/`default_second` pair as a [`ParserRef`].
fn pair_ref(first: ParserRef, default_second: Option<ParserRef>) -> ParserRef {
    Arc::new(Parser::Pair(Parser::pair(first, default_second)))
}

fn tristate_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "off", &["disable", "disabled", "dis", "idle"])?;
    t.add(1, "on", &["enable", "enabled", "en", "active"])?;
    t.add(0xFF, "n/a", &["?", "unchanged", "ignore", "unknown", "-1"])?;
    Ok(Arc::new(t))
}

fn valve_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "latch0", &[])?;
    t.add(1, "latch1", &[])?;
    t.add(16, "nonlatch0", &["momentary0", "non0", "mom0"])?;
    t.add(17, "nonlatch1", &["momentary1", "non1", "mom1"])?;
    t.add(18, "nonlatch2", &["momentary2", "non2", "mom2"])?;
    t.add(19, "nonlatch3", &["momentary3", "non3", "mom3"])?;
    Ok(Arc::new(t))
}

fn valve_state_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "closed", &["close", "deenergize", "deenergized"])?;
    t.add(1, "open", &["opened", "energize", "energized"])?;
    Ok(Arc::new(t))
}

fn uart_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "uart0", &[])?;
    t.add(1, "uart1", &[])?;
    t.add(2, "uart2", &[])?;
    Ok(Arc::new(t))
}

fn telemetry_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(1, "igniter_on", &["ig_en"])?;
    t.add(2, "lvps_voltage", &["lvps_v"])?;
    t.add(3, "lvps_duty", &[])?;
    t.add(4, "vbus_voltage", &["vbus_v"])?;
    t.add(5, "vbus_current", &["vbus_a"])?;
    t.add(6, "scrubber_sbe", &[])?;
    t.add(7, "scrubber_mbe", &[])?;
    t.add(8, "cpu_usage", &[])?;
    t.add(9, "cpu_delay", &[])?;
    t.add(10, "discharge_on", &[])?;
    t.add(11, "discharge_setpoint", &[])?;
    t.add(12, "discharge_period", &[])?;
    t.add(13, "discharge_voltage", &["discharge_v"])?;
    t.add(14, "discharge_cathode", &[])?;
    t.add(15, "discharge_current", &["discharge_a"])?;
    t.add(16, "thruster_state", &[])?;
    t.add(17, "thruster_attempts", &[])?;
    t.add(18, "discharge_current_mean", &[])?;
    t.add(19, "discharge_current_stddev", &[])?;
    t.add(20, "rtd1_discharge_q3", &["rtd1", "rtd_1_temp"])?;
    t.add(21, "rtd2_discharge_q2", &["rtd2", "rtd_2_temp"])?;
    t.add(22, "rtd3_discharge_q1", &["rtd3", "rtd_3_temp"])?;
    t.add(23, "rtd4_discharge_transformer", &["rtd4", "rtd_4_temp"])?;
    t.add(24, "thruster_temp", &[])?;
    t.add(25, "cpu_temp", &[])?;
    t.add(26, "thrust_duration", &["duration"])?;
    t.add(27, "flow_control_current", &["flow_c", "pfcv"])?;
    t.add(30, "valve_latching_0_on", &["latch0"])?;
    t.add(31, "valve_latching_1_on", &["latch1"])?;
    t.add(32, "valve_nonlatching_0_on", &["nonlatch0"])?;
    t.add(33, "valve_nonlatching_1_on", &["nonlatch1"])?;
    t.add(34, "tank_pressure", &["tank_p"])?;
    t.add(35, "plenum_pressure", &["plenum_p"])?;
    t.add(36, "feed_target_pressure", &["feed_tar_p"])?;
    t.add(37, "feed_target_current", &["feed_tar_a"])?;
    t.add(38, "valve_nonlatching_2_on", &["nonlatch2"])?;
    t.add(39, "valve_nonlatching_3_on", &["nonlatch3"])?;
    t.add(40, "adc_ain0", &[])?;
    t.add(41, "adc_ain1", &[])?;
    t.add(42, "adc_ain2", &[])?;
    t.add(43, "adc_ain3", &[])?;
    t.add(44, "adc_ain4", &[])?;
    t.add(45, "adc_ain5", &[])?;
    t.add(46, "adc_ain6", &[])?;
    t.add(47, "adc_ain7", &[])?;
    t.add(50, "adc_amux00", &[])?;
    t.add(51, "adc_amux01", &[])?;
    t.add(52, "adc_amux02", &[])?;
    t.add(53, "adc_amux03", &[])?;
    t.add(54, "adc_amux04", &[])?;
    t.add(55, "adc_amux10", &[])?;
    t.add(56, "adc_amux11", &[])?;
    t.add(57, "adc_amux12", &[])?;
    t.add(58, "adc_amux13", &[])?;
    t.add(59, "adc_amux14", &[])?;
    t.add(60, "valve_latching_0_time", &["latch0_time"])?;
    t.add(61, "valve_latching_1_time", &["latch1_time"])?;
    t.add(62, "valve_nonlatching_0_time", &["nonlatch0_time"])?;
    t.add(63, "valve_nonlatching_1_time", &["nonlatch1_time"])?;
    t.add(64, "valve_nonlatching_2_time", &["nonlatch2_time"])?;
    t.add(65, "valve_nonlatching_3_time", &["nonlatch3_time"])?;
    t.add(70, "edu_load_current", &["load_a"])?;
    t.add(71, "edu_load_power", &["load_w"])?;
    t.add(72, "edu_load_temp", &["load_t"])?;
    t.add(73, "edu_fan_on", &["fan_on"])?;
    t.add(0xF0, "zero", &[])?;
    t.add(0xF1, "forty_two", &[])?;
    t.add(0xF2, "time", &[])?;
    Ok(Arc::new(t))
}

fn channel_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(0, "description", &[])?;
    t.add(1, "console_input", &[])?;
    t.add(2, "console_output", &[])?;
    t.add(3, "space_command", &[])?;
    t.add(4, "space_reply", &[])?;
    Ok(Arc::new(t))
}

fn health_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(2, "lvps_voltage", &["lvps_v"])?;
    t.add(4, "vbus_voltage", &["vbus_v"])?;
    t.add(5, "vbus_current", &["vbus_a"])?;
    t.add(13, "discharge_voltage", &["discharge_v"])?;
    t.add(14, "discharge_cathode", &[])?;
    t.add(15, "discharge_current", &["discharge_a"])?;
    t.add(16, "discharge_overcurrent", &[])?;
    t.add(17, "thruster_attempts", &[])?;
    t.add(20, "rtd_1_temp", &["rtd1"])?;
    t.add(21, "rtd_2_temp", &["rtd2"])?;
    t.add(22, "rtd_3_temp", &["rtd3"])?;
    t.add(23, "rtd_4_temp", &["rtd4"])?;
    t.add(24, "thruster_temp", &[])?;
    t.add(25, "cpu_temp", &[])?;
    t.add(26, "thrust_duration", &["duration"])?;
    t.add(35, "plenum_pressure", &[])?;
    t.add(72, "edu_load_temp", &["load_t"])?;
    t.add(100, "feed_valve", &[])?;
    t.add(101, "feed_ignited", &[])?;
    t.add(102, "cpu_rebooted", &["boot"])?;
    t.add(103, "config_error", &["config"])?;
    t.add(0xFF, "all", &[])?;
    Ok(Arc::new(t))
}

/// The configuration-parameter identifier table. Exposed so [`crate::session`]
/// can enumerate parameter labels for `csave`/`cload` the same way it
/// recovers any other registered identifier table: by asking the registry
/// for the `cerase` command's request parser (`SPEC_FULL.md` §9).
pub fn config_id_table() -> Result<Arc<IdentifierTable>> {
    let mut t = IdentifierTable::new();
    t.add(1, "serial_num", &["serial"])?;
    t.add(2, "hw_variant", &["variant"])?;
    t.add(3, "space_address", &["address"])?;
    t.add(4, "part_number", &["part", "part_num"])?;
    t.add(10, "edu_load_disable", &[])?;
    t.add(20, "flow_ignition_amps", &[])?;
    t.add(21, "feed_ignition_amps", &[])?;
    t.add(22, "feed_ignition_psi", &[])?;
    t.add(23, "feed_delta_psi", &[])?;
    t.add(24, "feed_stddev_amps", &[])?;
    t.add(30, "plenum_0psi_volts", &[])?;
    t.add(31, "plenum_ref_volts", &[])?;
    t.add(32, "plenum_ref_psi", &[])?;
    t.add(33, "tank_0psi_volts", &[])?;
    t.add(34, "tank_ref_volts", &[])?;
    t.add(35, "tank_ref_psi", &[])?;
    t.add(36, "vbus_offset_amps", &[])?;
    t.add(0xFF, "all", &[])?;
    Ok(Arc::new(t))
}

/// Register every ACE-common command into `registry`. Shared by
/// [`build_registry`] and `ace_max`, which layers its own commands on top.
pub fn register_all(registry: &mut CommandRegistry) -> Result<()> {
    let tristate = tristate_table()?;
    let valve_id = valve_id_table()?;
    let valve_state = valve_state_table()?;
    let uart_id = uart_id_table()?;
    let telemetry_id = telemetry_id_table()?;
    let channel_id = channel_id_table()?;
    let health_id = health_id_table()?;
    let config_id = config_id_table()?;

    let float = || Parser::float32(None, ' ');
    let byte = || Parser::integer(IntWidth::W8, false, ' ');

    // Operational commands.
    registry.register(0x10, "igniter", 0.002, Some(float()), Some(float()))?;
    registry.register(
        0x12,
        "discharge",
        0.002,
        Some(Parser::identifier(tristate.clone(), ' ')),
        Some(Parser::identifier(tristate.clone(), ' ')),
    )?;
    registry.register(
        0x16,
        "valve",
        0.005,
        Some(Parser::list(
            pair_ref(Parser::identifier(valve_id.clone(), '='), Some(float())),
            None,
            " ",
        )),
        Some(Parser::list(
            pair_ref(
                Parser::identifier(valve_id.clone(), '='),
                Some(Parser::identifier(valve_state.clone(), ' ')),
            ),
            None,
            " ",
        )),
    )?;
    registry.register(
        0x18,
        "flow",
        0.002,
        Some(Parser::list(float(), Some(1), " ")),
        Some(float()),
    )?;
    registry.register(
        0x1A,
        "thrust",
        0.002,
        Some(pair_ref(
            Parser::identifier(tristate.clone(), ' '),
            Some(Parser::list(float(), Some(4), " ")),
        )),
        Some(Parser::identifier(tristate.clone(), ' ')),
    )?;
    registry.register(0x1C, "feedpres", 0.002, Some(float()), Some(float()))?;
    registry.register(0x1E, "feedcur", 0.002, Some(float()), Some(float()))?;

    // Telemetry commands.
    let telemetry_field = || pair_ref(Parser::identifier(telemetry_id.clone(), '='), Some(float()));
    registry.register(
        0x20,
        "tele",
        0.005,
        Some(Parser::list(Parser::identifier(telemetry_id.clone(), ' '), None, " ")),
        Some(Parser::list(telemetry_field(), None, " ")),
    )?;
    registry.register(
        0x22,
        "telexl",
        0.020,
        Some(Parser::list(Parser::identifier(telemetry_id.clone(), ' '), None, " ")),
        Some(Parser::list(telemetry_field(), None, " ")),
    )?;
    registry.register(
        0x24,
        "telefreq",
        0.005,
        Some(Parser::list(telemetry_field(), None, " ")),
        Some(Parser::list(telemetry_field(), None, " ")),
    )?;
    registry.register(
        0x26,
        "telechan",
        0.005,
        Some(Parser::list(
            pair_ref(
                Parser::identifier(channel_id.clone(), '='),
                Some(Parser::identifier(tristate.clone(), ' ')),
            ),
            None,
            " ",
        )),
        Some(Parser::list(
            pair_ref(
                Parser::identifier(channel_id.clone(), '='),
                Some(Parser::identifier(tristate.clone(), ' ')),
            ),
            None,
            " ",
        )),
    )?;
    registry.register(
        0x28,
        "telestart",
        0.005,
        Some(pair_ref(
            Parser::identifier(uart_id.clone(), ' '),
            Some(Parser::integer(IntWidth::W32, false, ' ')),
        )),
        Some(pair_ref(
            Parser::identifier(uart_id.clone(), ' '),
            Some(Parser::integer(IntWidth::W32, false, ' ')),
        )),
    )?;
    registry.register(
        0x2E,
        "teleset",
        0.020,
        Some(Parser::list(telemetry_field(), None, " ")),
        Some(Parser::list(telemetry_field(), None, " ")),
    )?;

    // Health-check commands.
    registry.register(
        0x30,
        "henable",
        0.020,
        Some(Parser::list(
            pair_ref(
                Parser::identifier(health_id.clone(), '='),
                Some(Parser::identifier(tristate.clone(), ' ')),
            ),
            None,
            " ",
        )),
        Some(Parser::list(Parser::identifier(health_id.clone(), ' '), None, " ")),
    )?;
    registry.register(
        0x32,
        "htrip",
        0.020,
        Some(Parser::list(Parser::identifier(health_id.clone(), ' '), None, " ")),
        Some(Parser::list(
            pair_ref(Parser::identifier(health_id.clone(), '='), Some(float())),
            None,
            " ",
        )),
    )?;
    registry.register(
        0x34,
        "hreset",
        0.005,
        Some(Parser::list(Parser::identifier(health_id.clone(), ' '), None, " ")),
        Some(Parser::list(Parser::identifier(health_id.clone(), ' '), None, " ")),
    )?;
    registry.register(
        0x36,
        "hconfig",
        0.005,
        Some(pair_ref(
            Parser::identifier(health_id.clone(), ' '),
            Some(Parser::list(float(), Some(3), " ")),
        )),
        Some(pair_ref(
            Parser::identifier(health_id.clone(), ' '),
            Some(Parser::list(float(), Some(3), " ")),
        )),
    )?;

    // Configuration commands.
    registry.register(
        0x40,
        "cvalue",
        0.020,
        Some(pair_ref(
            Parser::identifier(config_id.clone(), ' '),
            Some(Parser::list(float(), Some(2), " ")),
        )),
        Some(pair_ref(
            Parser::identifier(config_id.clone(), ' '),
            Some(Parser::list(float(), Some(3), " ")),
        )),
    )?;
    registry.register(
        0x42,
        "cstring",
        0.020,
        Some(pair_ref(
            Parser::identifier(config_id.clone(), ' '),
            Some(Parser::list(Parser::string(' '), Some(2), " ")),
        )),
        Some(pair_ref(
            Parser::identifier(config_id.clone(), ' '),
            Some(Parser::list(Parser::string(' '), Some(3), " ")),
        )),
    )?;
    registry.register(
        0x44,
        "cerase",
        0.005,
        Some(Parser::identifier(config_id.clone(), ' ')),
        Some(Parser::list(Parser::identifier(config_id.clone(), ' '), Some(1), " ")),
    )?;

    // System commands.
    registry.register(0x02, "sysver", 0.020, None, Some(Parser::string(' ')))?;
    registry.register(
        0x04,
        "echo",
        0.020,
        Some(Parser::list(byte(), None, " ")),
        Some(Parser::list(byte(), None, " ")),
    )?;
    registry.register(0x06, "delay", 0.100, Some(float()), Some(float()))?;
    registry.register(0x08, "sysreset", 0.002, Some(float()), Some(float()))?;
    registry.register(
        0x0A,
        "syspeek",
        0.020,
        Some(pair_ref(
            Parser::integer(IntWidth::W32, false, ' '),
            Some(byte()),
        )),
        Some(pair_ref(
            Parser::integer(IntWidth::W32, false, ' '),
            Some(Parser::list(byte(), None, " ")),
        )),
    )?;
    registry.register(
        0x0C,
        "syspoke",
        0.020,
        Some(pair_ref(
            Parser::integer(IntWidth::W32, false, ' '),
            Some(Parser::list(byte(), None, " ")),
        )),
        Some(pair_ref(
            Parser::integer(IntWidth::W32, false, ' '),
            Some(byte()),
        )),
    )?;

    Ok(())
}

/// Build the ACE Rad-Hard command registry (the common set, unmodified).
pub fn build_registry() -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}
