//! Bus registry and initialization

use hwmem_core::Bus;

/// Bus opened when none is given on the command line
pub const DEFAULT_BUS: &str = "devicetree";

/// Information about a bus backend
pub struct BusInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description, including parameters
    pub description: &'static str,
}

/// Get information about all bus backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_buses() -> Vec<BusInfo> {
    let mut buses = Vec::new();

    #[cfg(feature = "devicetree")]
    buses.push(BusInfo {
        name: "devicetree",
        aliases: &["dt"],
        description: "Linux device tree + /dev/mem (root=<dir>,mem=<path>) - requires root",
    });

    #[cfg(feature = "dummy")]
    buses.push(BusInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory emulated devices for testing (file=<bus.ron>)",
    });

    buses
}

/// Generate help text listing all available buses
pub fn bus_help() -> String {
    let buses = available_buses();

    if buses.is_empty() {
        return "No bus backends available (recompile with bus features enabled)".to_string();
    }

    let mut help = String::from("Available buses:\n");
    for b in &buses {
        help.push_str(&format!("  {:12} - {}\n", b.name, b.description));
    }
    help
}

/// Generate a short list of bus names for CLI help
pub fn bus_names_short() -> String {
    let buses = available_buses();
    let names: Vec<&str> = buses.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parsed bus descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusParams {
    /// Bus name as given
    pub name: String,
    /// Key-value parameters, in the order given
    pub params: Vec<(String, String)>,
}

impl BusParams {
    /// Parameters as borrowed pairs, the form backends take
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a bus descriptor into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```
/// let params = hwmem_bus::parse_bus_params("dummy:file=board.ron").unwrap();
/// assert_eq!(params.name, "dummy");
/// assert_eq!(params.options(), [("file", "board.ron")]);
/// ```
pub fn parse_bus_params(s: &str) -> Result<BusParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    if name.is_empty() {
        return Err("Empty bus name".into());
    }

    let mut params = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.push((key.to_string(), value.to_string()));
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BusParams {
        name: name.to_string(),
        params,
    })
}

/// Open a bus backend
///
/// This is the main entry point for the CLI. The returned bus owns every
/// device it enumerates; dropping it releases them.
///
/// # Arguments
/// * `descriptor` - Bus descriptor (e.g., "devicetree" or "dummy:file=board.ron")
pub fn open_bus(descriptor: &str) -> Result<Box<dyn Bus>, Box<dyn std::error::Error>> {
    let params = parse_bus_params(descriptor)?;

    match params.name.as_str() {
        #[cfg(feature = "devicetree")]
        "devicetree" | "dt" => open_devicetree(&params),

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        _ => Err(unknown_bus_error(&params.name)),
    }
}

#[cfg(feature = "devicetree")]
fn open_devicetree(params: &BusParams) -> Result<Box<dyn Bus>, Box<dyn std::error::Error>> {
    log::info!("Opening device tree bus...");

    let bus = hwmem_devicetree::open_devicetree(&params.options()).map_err(|e| {
        format!(
            "Failed to open device tree bus: {}\n\
             Make sure the kernel exposes /proc/device-tree or pass root=<dir>.",
            e
        )
    })?;

    Ok(Box::new(bus))
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &BusParams) -> Result<Box<dyn Bus>, Box<dyn std::error::Error>> {
    log::info!("Opening dummy bus...");

    let bus = hwmem_dummy::DummyBus::open(&params.options())
        .map_err(|e| format!("Failed to open dummy bus: {}", e))?;

    Ok(Box::new(bus))
}

fn unknown_bus_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown bus: {}\n\n", name);
    msg.push_str(&bus_help());
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let params = parse_bus_params("devicetree").unwrap();
        assert_eq!(params.name, "devicetree");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_keeps_parameter_order() {
        let params = parse_bus_params("devicetree:root=/tmp/dt,mem=/tmp/mem").unwrap();
        assert_eq!(params.options(), [("root", "/tmp/dt"), ("mem", "/tmp/mem")]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_bus_params("dummy:file").is_err());
        assert!(parse_bus_params(":file=x").is_err());
        assert!(parse_bus_params("").is_err());
    }

    #[test]
    fn test_unknown_bus() {
        let err = open_bus("pcie").err().unwrap();
        assert!(err.to_string().starts_with("Unknown bus: pcie"));
    }

    #[test]
    fn test_help_lists_compiled_buses() {
        let help = bus_help();
        for bus in available_buses() {
            assert!(help.contains(bus.name));
            assert!(bus_names_short().contains(bus.name));
        }
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let mut bus = open_bus("dummy").unwrap();
        assert!(bus
            .find_devices(&[hwmem_core::CompatSpec::new("foo,bar")])
            .is_empty());
    }

    #[cfg(feature = "devicetree")]
    #[test]
    fn test_open_devicetree_missing_root() {
        let err = open_bus("dt:root=/nonexistent/dt").err().unwrap();
        assert!(err.to_string().contains("Failed to open device tree bus"));
    }
}
