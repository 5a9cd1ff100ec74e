//! Low-precision analytic planet ephemerides.
//!
//! Mean Keplerian elements and their linear rates per Julian century from the
//! JPL table "Keplerian Elements for Approximate Positions of the Major
//! Planets" (E. M. Standish), valid 1800 AD – 2050 AD. Earth is represented by
//! the Earth–Moon barycenter, matching the table.

use std::fmt;
use std::str::FromStr;

use scout_core::constants::{AU_KM, MU_SUN_KM3_S2};
use scout_core::time::julian_centuries_since_j2000;
use scout_core::units::deg_to_rad;

use crate::kepler::elements_to_state;
use crate::{Ephemeris, EphemerisError, StateVector};

/// First valid epoch (1800-01-01) in MJD2000 days.
pub const VALID_FROM_MJD2000: f64 = -73_048.0;
/// Last valid epoch (2050-01-01) in MJD2000 days.
pub const VALID_UNTIL_MJD2000: f64 = 18_263.0;

/// Major planets covered by the low-precision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Planet {
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

/// Mean elements at J2000 and rates per century:
/// a (AU), e, I (deg), L (deg), long. perihelion (deg), long. ascending node (deg).
struct MeanElements {
    base: [f64; 6],
    rate: [f64; 6],
}

impl Planet {
    pub const ALL: [Planet; 9] = [
        Planet::Mercury,
        Planet::Venus,
        Planet::Earth,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
        Planet::Pluto,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Earth => "Earth",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
            Planet::Pluto => "Pluto",
        }
    }

    /// Gravitational parameter of the planet system (km³/s²).
    pub fn gm_km3_s2(self) -> f64 {
        match self {
            Planet::Mercury => 22_031.78,
            Planet::Venus => 324_858.592,
            Planet::Earth => 403_503.235_502,
            Planet::Mars => 42_828.375_214,
            Planet::Jupiter => 126_712_764.1,
            Planet::Saturn => 37_940_585.2,
            Planet::Uranus => 5_794_556.4,
            Planet::Neptune => 6_836_527.100_58,
            Planet::Pluto => 975.5,
        }
    }

    /// Semi-major axis of the J2000 mean orbit (km).
    pub fn mean_semi_major_axis_km(self) -> f64 {
        self.mean_elements().base[0] * AU_KM
    }

    fn mean_elements(self) -> MeanElements {
        match self {
            Planet::Mercury => MeanElements {
                base: [0.387_099_27, 0.205_635_93, 7.004_979_02, 252.250_323_50, 77.457_796_28, 48.330_765_93],
                rate: [0.000_000_37, 0.000_019_06, -0.005_947_49, 149_472.674_111_75, 0.160_476_89, -0.125_340_81],
            },
            Planet::Venus => MeanElements {
                base: [0.723_335_66, 0.006_776_72, 3.394_676_05, 181.979_099_50, 131.602_467_18, 76.679_842_55],
                rate: [0.000_003_90, -0.000_041_07, -0.000_788_90, 58_517.815_387_29, 0.002_683_29, -0.277_694_18],
            },
            Planet::Earth => MeanElements {
                base: [1.000_002_61, 0.016_711_23, -0.000_015_31, 100.464_571_66, 102.937_681_93, 0.0],
                rate: [0.000_005_62, -0.000_043_92, -0.012_946_68, 35_999.372_449_81, 0.323_273_64, 0.0],
            },
            Planet::Mars => MeanElements {
                base: [1.523_710_34, 0.093_394_10, 1.849_691_42, -4.553_432_05, -23.943_629_59, 49.559_538_91],
                rate: [0.000_018_47, 0.000_078_82, -0.008_131_31, 19_140.302_684_99, 0.444_410_88, -0.292_573_43],
            },
            Planet::Jupiter => MeanElements {
                base: [5.202_887_00, 0.048_386_24, 1.304_396_95, 34.396_440_51, 14.728_479_83, 100.473_909_09],
                rate: [-0.000_116_07, -0.000_132_53, -0.001_837_14, 3_034.746_127_75, 0.212_526_68, 0.204_691_06],
            },
            Planet::Saturn => MeanElements {
                base: [9.536_675_94, 0.053_861_79, 2.485_991_87, 49.954_244_23, 92.598_878_31, 113.662_424_48],
                rate: [-0.001_250_60, -0.000_509_91, 0.001_936_09, 1_222.493_622_01, -0.418_972_16, -0.288_677_94],
            },
            Planet::Uranus => MeanElements {
                base: [19.189_164_64, 0.047_257_44, 0.772_637_83, 313.238_104_51, 170.954_276_30, 74.016_925_03],
                rate: [-0.001_961_76, -0.000_043_97, -0.002_429_39, 428.482_027_85, 0.408_052_81, 0.042_405_89],
            },
            Planet::Neptune => MeanElements {
                base: [30.069_922_76, 0.008_590_48, 1.770_043_47, -55.120_029_69, 44.964_762_27, 131.784_225_74],
                rate: [0.000_262_91, 0.000_051_05, 0.000_353_72, 218.459_453_25, -0.322_414_64, -0.005_086_64],
            },
            Planet::Pluto => MeanElements {
                base: [39.482_116_75, 0.248_827_30, 17.140_012_06, 238.929_038_33, 224.068_916_29, 110.303_936_84],
                rate: [-0.000_315_96, 0.000_051_70, 0.000_048_18, 145.207_805_15, -0.040_629_42, -0.011_834_82],
            },
        }
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Planet {
    type Err = EphemerisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let upper = upper.trim_end_matches(" BARYCENTER");
        match upper {
            "MERCURY" => Ok(Planet::Mercury),
            "VENUS" => Ok(Planet::Venus),
            "EARTH" | "EARTH-MOON" | "EMB" => Ok(Planet::Earth),
            "MARS" => Ok(Planet::Mars),
            "JUPITER" => Ok(Planet::Jupiter),
            "SATURN" => Ok(Planet::Saturn),
            "URANUS" => Ok(Planet::Uranus),
            "NEPTUNE" => Ok(Planet::Neptune),
            "PLUTO" => Ok(Planet::Pluto),
            _ => Err(EphemerisError::UnknownBody(s.to_string())),
        }
    }
}

/// JPL low-precision ephemeris of one planet.
#[derive(Debug, Clone, Copy)]
pub struct JplLowPrecision {
    planet: Planet,
}

impl JplLowPrecision {
    pub fn new(planet: Planet) -> Self {
        Self { planet }
    }

    /// Look a planet up by case-insensitive name (`"earth"`, `"MARS BARYCENTER"`, ...).
    pub fn by_name(name: &str) -> Result<Self, EphemerisError> {
        name.parse().map(Self::new)
    }

    pub fn planet(&self) -> Planet {
        self.planet
    }
}

impl Ephemeris for JplLowPrecision {
    fn name(&self) -> &str {
        self.planet.name()
    }

    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError> {
        if !(VALID_FROM_MJD2000..=VALID_UNTIL_MJD2000).contains(&epoch_mjd2000) {
            return Err(EphemerisError::OutOfRange {
                body: self.planet.name().to_string(),
                epoch: epoch_mjd2000,
                min: VALID_FROM_MJD2000,
                max: VALID_UNTIL_MJD2000,
            });
        }

        let t = julian_centuries_since_j2000(epoch_mjd2000);
        let elements = self.planet.mean_elements();
        let el: [f64; 6] = std::array::from_fn(|k| elements.base[k] + elements.rate[k] * t);

        let semi_major_axis_km = el[0] * AU_KM;
        let eccentricity = el[1];
        let inclination = deg_to_rad(el[2]);
        let mean_longitude = el[3];
        let long_perihelion = el[4];
        let long_node = el[5];

        let argument_of_periapsis = deg_to_rad(long_perihelion - long_node);
        let mean_anomaly = deg_to_rad(wrap_degrees(mean_longitude - long_perihelion));

        elements_to_state(
            semi_major_axis_km,
            eccentricity,
            inclination,
            deg_to_rad(long_node),
            argument_of_periapsis,
            mean_anomaly,
            MU_SUN_KM3_S2,
        )
    }
}

/// Wrap an angle in degrees into (-180, 180].
fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}
