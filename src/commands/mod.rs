//! Command implementations

pub mod list;

use crate::cli::Cli;
use clap::CommandFactory;
use hwmem_bus::{open_bus, Bus};
use hwmem_core::{
    dispatch, select, CompatSpec, DispatchError, Operation, ParseError, SelectionError,
    SelectionMode, Target,
};
use std::error::Error;
use std::io::{self, Write};
use thiserror::Error;

/// Everything that makes `hwmem` exit with a failure status
#[derive(Debug, Error)]
pub enum CliError {
    /// No compatibility string on the command line
    #[error("at least compatibility string is required")]
    MissingCompat,

    /// Compatibility string without ADDRESS and without `-l`
    #[error("need at least compatibility string and address")]
    MissingAddress,

    /// The bus backend could not be opened
    #[error("{0}")]
    Bus(Box<dyn Error>),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Whether the usage text should follow the error message
    pub fn wants_help(&self) -> bool {
        matches!(
            self,
            CliError::MissingCompat
                | CliError::MissingAddress
                | CliError::Parse(ParseError::TokenCount(_))
                | CliError::Parse(ParseError::InvalidWidth(_))
        )
    }
}

/// Open the requested bus and run the command line against it
///
/// The bus lives until this function returns, so every mapping is released
/// before the caller decides on the exit status.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    check_usage(cli)?;

    let mut bus = open_bus(&cli.bus).map_err(CliError::Bus)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_bus(cli, bus.as_mut(), &mut out)
}

/// Query `bus`, then list and/or access the matching devices
pub fn run_with_bus<W: Write + ?Sized>(
    cli: &Cli,
    bus: &mut dyn Bus,
    out: &mut W,
) -> Result<(), CliError> {
    let compat = check_usage(cli)?;

    let specs = [CompatSpec::new(compat)];
    let targets = Target::enumerate(bus.find_devices(&specs));
    log::info!("{} device(s) compatible with '{}'", targets.len(), compat);

    if cli.list {
        list::print_devices(out, &targets)?;
        if cli.operands.is_empty() {
            return Ok(());
        }
    }

    let mode = SelectionMode::from_flags(cli.all, cli.device)?;
    let mut selected = select(targets, mode)?;
    let op = Operation::parse(&cli.operands)?;
    log::debug!("{:?} on {} device(s)", op, selected.len());

    dispatch(&mut selected, &op, out)?.into_result()?;
    Ok(())
}

/// Checks that need nothing but the command line
fn check_usage(cli: &Cli) -> Result<&str, CliError> {
    let compat = cli.compat.as_deref().ok_or(CliError::MissingCompat)?;
    match cli.operands.len() {
        0 if cli.list => Ok(compat),
        0 => Err(CliError::MissingAddress),
        n if n > 3 => Err(ParseError::TokenCount(n).into()),
        _ => Ok(compat),
    }
}

/// Print `err` as `[Error]` lines, one per failed device for dispatch errors
pub fn report_error<W: Write + ?Sized>(err: &CliError, w: &mut W) -> io::Result<()> {
    match err {
        CliError::Dispatch(DispatchError::Failed { total, failures }) => {
            for failure in failures {
                writeln!(w, "[Error] device #{}: {}", failure.index, failure.error)?;
            }
            writeln!(w, "[Error] {} of {} devices failed", failures.len(), total)?;
        }
        _ => writeln!(w, "[Error] {}", err)?,
    }

    if err.wants_help() {
        writeln!(w)?;
        write!(w, "{}", Cli::command().render_help())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use hwmem_core::DeviceError;
    use hwmem_dummy::{DummyBus, DummyConfig, DummyDevice};

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("hwmem").chain(args.iter().copied())).unwrap()
    }

    fn device(name: &str, compat: &str, size: usize) -> DummyDevice {
        let mut data = vec![0u8; size];
        if let Some(reg) = data.get_mut(0x1000..0x1004) {
            reg.copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        }
        DummyDevice::with_data(DummyConfig::new(name, compat, size), &data)
    }

    fn board() -> DummyBus {
        DummyBus::new(vec![
            device("uart0", "foo,bar", 0x2000),
            device("spi0", "foo,spi", 0x2000),
        ])
    }

    fn twin_board() -> DummyBus {
        DummyBus::new(vec![
            device("uart0", "foo,bar", 0x2000),
            device("uart1", "foo,bar", 0x2000),
        ])
    }

    fn run_on(bus: &mut DummyBus, args: &[&str]) -> (Result<(), CliError>, String) {
        let mut out = Vec::new();
        let result = run_with_bus(&cli(args), bus, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn attach_counts(bus: &DummyBus) -> Vec<usize> {
        bus.devices().iter().map(|d| d.attach_count()).collect()
    }

    #[test]
    fn test_default_read() {
        let mut bus = board();
        let (result, out) = run_on(&mut bus, &["foo,bar", "0x1000"]);
        result.unwrap();
        assert_eq!(out, "0x12345678\n");
        assert_eq!(attach_counts(&bus), [1, 0]);
    }

    #[test]
    fn test_narrow_read() {
        let mut bus = board();
        let (result, out) = run_on(&mut bus, &["foo,bar", "0x1001", "16"]);
        result.unwrap();
        assert_eq!(out, "0x3456\n");
    }

    #[test]
    fn test_write_prints_nothing() {
        let mut bus = board();
        let (result, out) = run_on(&mut bus, &["foo,bar", "4096", "16", "255"]);
        result.unwrap();
        assert!(out.is_empty());
        assert_eq!(&bus.devices()[0].data()[0x1000..0x1002], 255u16.to_ne_bytes());
        assert_eq!(bus.devices()[0].data()[0x1002], 0x34);
    }

    #[test]
    fn test_write_negative_value() {
        let mut bus = board();
        let (result, _) = run_on(&mut bus, &["foo,bar", "0x10", "32", "-1"]);
        result.unwrap();
        assert_eq!(&bus.devices()[0].data()[0x10..0x14], [0xff; 4]);
    }

    #[test]
    fn test_all_devices() {
        let mut bus = twin_board();
        let (result, out) = run_on(&mut bus, &["-A", "foo,bar", "0x1000", "8"]);
        result.unwrap();
        assert_eq!(out, "0x78\n0x78\n");
        assert_eq!(attach_counts(&bus), [1, 1]);
    }

    #[test]
    fn test_ambiguous_does_no_io() {
        let mut bus = twin_board();
        let (result, out) = run_on(&mut bus, &["foo,bar", "0x1000"]);
        assert!(matches!(
            result,
            Err(CliError::Selection(SelectionError::AmbiguousSelection { count: 2 }))
        ));
        assert!(out.is_empty());
        assert_eq!(attach_counts(&bus), [0, 0]);
    }

    #[test]
    fn test_index_selects_one() {
        let mut bus = twin_board();
        let (result, out) = run_on(&mut bus, &["-d", "1", "foo,bar", "0x1000", "8"]);
        result.unwrap();
        assert_eq!(out, "0x78\n");
        assert_eq!(attach_counts(&bus), [0, 1]);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut bus = twin_board();
        for index in ["2", "-1"] {
            let (result, _) = run_on(&mut bus, &["-d", index, "foo,bar", "0"]);
            assert!(matches!(
                result,
                Err(CliError::Selection(SelectionError::IndexOutOfRange { count: 2, .. }))
            ));
        }
        assert_eq!(attach_counts(&bus), [0, 0]);
    }

    #[test]
    fn test_conflicting_modes_do_no_io() {
        let mut bus = twin_board();
        let mut conflicting = cli(&["-A", "foo,bar", "0x1000"]);
        conflicting.device = Some(0);
        let mut out = Vec::new();
        let result = run_with_bus(&conflicting, &mut bus, &mut out);
        assert!(matches!(
            result,
            Err(CliError::Selection(SelectionError::ConflictingModes))
        ));
        assert_eq!(attach_counts(&bus), [0, 0]);
    }

    #[test]
    fn test_no_device() {
        let mut bus = board();
        let (result, _) = run_on(&mut bus, &["foo,none", "0"]);
        assert!(matches!(
            result,
            Err(CliError::Selection(SelectionError::NoDevice))
        ));
    }

    #[test]
    fn test_invalid_width() {
        for width in ["0", "12", "abc"] {
            let mut bus = board();
            let (result, out) = run_on(&mut bus, &["foo,bar", "0x1000", width]);
            let err = result.unwrap_err();
            assert!(matches!(err, CliError::Parse(ParseError::InvalidWidth(_))));
            assert!(err.wants_help());
            assert!(out.is_empty());
            assert_eq!(attach_counts(&bus), [0, 0]);
        }
    }

    #[test]
    fn test_wide_write_rejected() {
        let mut bus = board();
        let (result, _) = run_on(&mut bus, &["foo,bar", "0", "72", "1"]);
        assert!(matches!(
            result,
            Err(CliError::Parse(ParseError::UnsupportedWidth { bytes: 9 }))
        ));
        assert_eq!(attach_counts(&bus), [0, 0]);
        assert!(bus.devices()[0].data()[..9].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_wide_read_allowed() {
        let mut bus = board();
        let (result, out) = run_on(&mut bus, &["foo,bar", "0x1000", "96"]);
        result.unwrap();
        assert_eq!(out, "0x000000000000000012345678\n");
    }

    #[test]
    fn test_list_only() {
        let mut bus = twin_board();
        let (result, out) = run_on(&mut bus, &["-l", "foo,bar"]);
        result.unwrap();
        assert!(out.starts_with("Available devices (2): \n"));
        assert!(out.contains("name: uart0"));
        assert!(out.contains("name: uart1"));
        assert_eq!(out.matches("----------------------------\n").count(), 2);
        assert_eq!(attach_counts(&bus), [0, 0]);
    }

    #[test]
    fn test_list_then_access() {
        let mut bus = board();
        let (result, out) = run_on(&mut bus, &["-l", "foo,bar", "0x1000", "8"]);
        result.unwrap();
        assert!(out.starts_with("Available devices (1): \n"));
        assert!(out.ends_with("----------------------------\n0x78\n"));
    }

    #[test]
    fn test_list_before_selection_error() {
        let mut bus = twin_board();
        let (result, out) = run_on(&mut bus, &["-l", "foo,bar", "0x1000"]);
        assert!(matches!(result, Err(CliError::Selection(_))));
        assert!(out.starts_with("Available devices (2): "));
    }

    #[test]
    fn test_usage_errors() {
        let mut bus = board();
        let (result, _) = run_on(&mut bus, &[]);
        assert!(matches!(result, Err(CliError::MissingCompat)));

        let (result, _) = run_on(&mut bus, &["foo,bar"]);
        assert!(matches!(result, Err(CliError::MissingAddress)));

        let (result, _) = run_on(&mut bus, &["foo,bar", "0", "32", "1", "2"]);
        assert!(matches!(
            result,
            Err(CliError::Parse(ParseError::TokenCount(4)))
        ));
        assert_eq!(attach_counts(&bus), [0, 0]);
    }

    #[test]
    fn test_partial_failure() {
        let mut bus = DummyBus::new(vec![
            device("uart0", "foo,bar", 0x1000),
            device("uart1", "foo,bar", 0x2000),
        ]);
        let (result, out) = run_on(&mut bus, &["-A", "foo,bar", "0x1000", "8"]);
        assert_eq!(out, "0x78\n");
        match result {
            Err(CliError::Dispatch(DispatchError::Failed { total, failures })) => {
                assert_eq!(total, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, 0);
                assert!(matches!(
                    failures[0].error,
                    DeviceError::OutOfBounds { address: 0x1000, len: 1, size: 0x1000 }
                ));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(attach_counts(&bus), [1, 1]);
    }

    #[test]
    fn test_report_dispatch_failure() {
        let mut bus = DummyBus::new(vec![device("uart0", "foo,bar", 0x1000)]);
        let (result, _) = run_on(&mut bus, &["foo,bar", "0x1000"]);
        let mut err_out = Vec::new();
        report_error(&result.unwrap_err(), &mut err_out).unwrap();
        let text = String::from_utf8(err_out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[Error] device #0: "));
        assert!(lines[0].contains("outside the 0x1000-byte device window"));
        assert_eq!(lines[1], "[Error] 1 of 1 devices failed");
    }

    #[test]
    fn test_report_width_error_prints_help() {
        let err = CliError::Parse(ParseError::InvalidWidth("12".into()));
        let mut err_out = Vec::new();
        report_error(&err, &mut err_out).unwrap();
        let text = String::from_utf8(err_out).unwrap();
        assert!(text.starts_with("[Error] WIDTH is in wrong format got:12\n"));
        assert!(text.contains("Usage:"));
    }

    #[test]
    fn test_report_selection_error_no_help() {
        let err = CliError::Selection(SelectionError::AmbiguousSelection { count: 3 });
        let mut err_out = Vec::new();
        report_error(&err, &mut err_out).unwrap();
        let text = String::from_utf8(err_out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("devices_cnt=3"));
    }
}
