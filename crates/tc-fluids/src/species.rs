//! Chemical species definitions.

/// Chemical species relevant for power, heating and refrigeration cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    /// Water (H₂O)
    Water,
    /// Air (pseudo-pure fluid)
    Air,
    /// Nitrogen (N₂)
    N2,
    /// Oxygen (O₂)
    O2,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Methane (CH₄)
    CH4,
    /// Hydrogen (H₂)
    H2,
    /// Helium (He)
    He,
    /// Argon (Ar)
    Ar,
    /// Ammonia (NH₃)
    Ammonia,
    /// Refrigerant R134a
    R134a,
}

impl Species {
    pub const ALL: [Species; 11] = [
        Species::Water,
        Species::Air,
        Species::N2,
        Species::O2,
        Species::CO2,
        Species::CH4,
        Species::H2,
        Species::He,
        Species::Ar,
        Species::Ammonia,
        Species::R134a,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Species::Water => "H2O",
            Species::Air => "Air",
            Species::N2 => "N2",
            Species::O2 => "O2",
            Species::CO2 => "CO2",
            Species::CH4 => "CH4",
            Species::H2 => "H2",
            Species::He => "He",
            Species::Ar => "Ar",
            Species::Ammonia => "NH3",
            Species::R134a => "R134a",
        }
    }

    /// Get human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Species::Water => "Water",
            Species::Air => "Air",
            Species::N2 => "Nitrogen",
            Species::O2 => "Oxygen",
            Species::CO2 => "Carbon Dioxide",
            Species::CH4 => "Methane",
            Species::H2 => "Hydrogen",
            Species::He => "Helium",
            Species::Ar => "Argon",
            Species::Ammonia => "Ammonia",
            Species::R134a => "R134a",
        }
    }

    /// Get molar mass [kg/kmol] for this species.
    ///
    /// Values sourced from standard reference data (e.g., NIST).
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::Water => 18.015,
            Species::Air => 28.965,
            Species::N2 => 28.014,
            Species::O2 => 31.999,
            Species::CO2 => 44.010,
            Species::CH4 => 16.043,
            Species::H2 => 2.016,
            Species::He => 4.003,
            Species::Ar => 39.948,
            Species::Ammonia => 17.031,
            Species::R134a => 102.031,
        }
    }

    /// Constant-pressure heat capacity [J/(kg·K)] of the vapor/gas phase
    /// near 300 K, used by the calorically perfect gas backend.
    pub fn cp_gas(&self) -> f64 {
        match self {
            Species::Water => 1864.0,
            Species::Air => 1005.0,
            Species::N2 => 1040.0,
            Species::O2 => 918.0,
            Species::CO2 => 844.0,
            Species::CH4 => 2226.0,
            Species::H2 => 14304.0,
            Species::He => 5193.0,
            Species::Ar => 520.0,
            Species::Ammonia => 2175.0,
            Species::R134a => 852.0,
        }
    }

    /// Specific gas constant R = R_u / M [J/(kg·K)].
    pub fn gas_constant(&self) -> f64 {
        const R_UNIVERSAL: f64 = 8314.462618; // J/(kmol·K)
        R_UNIVERSAL / self.molar_mass()
    }
}

impl std::str::FromStr for Species {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "H2O" | "WATER" => Ok(Species::Water),
            "AIR" => Ok(Species::Air),
            "N2" | "NITROGEN" => Ok(Species::N2),
            "O2" | "OXYGEN" => Ok(Species::O2),
            "CO2" | "CARBONDIOXIDE" | "CARBON DIOXIDE" => Ok(Species::CO2),
            "CH4" | "METHANE" => Ok(Species::CH4),
            "H2" | "HYDROGEN" => Ok(Species::H2),
            "HE" | "HELIUM" => Ok(Species::He),
            "AR" | "ARGON" => Ok(Species::Ar),
            "NH3" | "AMMONIA" => Ok(Species::Ammonia),
            "R134A" => Ok(Species::R134a),
            _ => Err("unknown species"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("water".parse::<Species>().unwrap(), Species::Water);
        assert_eq!("NH3".parse::<Species>().unwrap(), Species::Ammonia);
        assert_eq!("Ammonia".parse::<Species>().unwrap(), Species::Ammonia);
        assert!("unobtainium".parse::<Species>().is_err());
    }

    #[test]
    fn canonical_key_roundtrip() {
        for species in Species::ALL {
            let parsed = species
                .key()
                .parse::<Species>()
                .expect("canonical key should parse");
            assert_eq!(parsed, species);
        }
    }

    #[test]
    fn gas_constants_plausible() {
        // R = R_u / M: hydrogen is the lightest, so it has the largest R.
        assert!(Species::H2.gas_constant() > Species::He.gas_constant());
        assert!((Species::Air.gas_constant() - 287.0).abs() < 1.0);
        for species in Species::ALL {
            // cv = cp - R must stay positive for the perfect gas model.
            assert!(species.cp_gas() > species.gas_constant());
        }
    }
}
