//! Built-in unit catalog organized by type
//!
//! Seeds a [`MemoryStore`] with common units, their aliases, a calibrated
//! gallon/litre override, a handful of compound units, and count packagings.

use gauge_core::{ConversionError, Number};
use crate::memory::{MemoryStore, NewUnit};
use crate::model::{Direction, Unit, UnitType};

fn dec(s: &str) -> Result<Number, ConversionError> {
    Ok(Number::from_str(s)?)
}

/// Builder that registers the standard catalog into a store
pub struct Catalog<'a> {
    store: &'a MemoryStore,
}

impl<'a> Catalog<'a> {
    /// Build a new store holding the full standard catalog
    pub fn standard() -> Result<MemoryStore, ConversionError> {
        let store = MemoryStore::new();
        Catalog::new(&store).register_all_units()?;
        Ok(store)
    }

    pub fn new(store: &'a MemoryStore) -> Self {
        Catalog { store }
    }

    pub fn register_all_units(&self) -> Result<(), ConversionError> {
        self.register_length_units()?;
        self.register_mass_units()?;
        self.register_time_units()?;
        self.register_volume_units()?;
        self.register_temperature_units()?;
        self.register_count_units()?;
        self.register_compound_units()?;
        Ok(())
    }

    fn unit_type(&self, code: &str, name: &str) -> Result<UnitType, ConversionError> {
        Ok(self.store.insert_unit_type(code, name)?)
    }

    fn register(&self, unit: NewUnit) -> Result<Unit, ConversionError> {
        Ok(self.store.insert_unit(unit)?)
    }

    fn unit(&self, code: &str) -> Result<Unit, ConversionError> {
        use crate::store::UnitStore;
        self.store.unit_by_name(&code.to_lowercase())?
            .ok_or_else(|| ConversionError::unit_not_found(code))
    }

    fn register_length_units(&self) -> Result<(), ConversionError> {
        let length = self.unit_type("length", "Length")?.id;

        self.register(NewUnit::new("m", "metre", length, Number::one()).base().with_precision(4)
            .with_preferred_alias("metre").with_alias("metres").with_alias("meter").with_alias("meters"))?;
        self.register(NewUnit::new("km", "kilometre", length, Number::from_i64(1000)).with_precision(6)
            .with_preferred_alias("kilometre").with_alias("kilometres").with_alias("kilometer").with_alias("kilometers"))?;
        self.register(NewUnit::new("cm", "centimetre", length, dec("0.01")?).with_precision(2)
            .with_preferred_alias("centimetre").with_alias("centimetres").with_alias("centimeter").with_alias("centimeters"))?;
        self.register(NewUnit::new("mm", "millimetre", length, dec("0.001")?).with_precision(1)
            .with_preferred_alias("millimetre").with_alias("millimetres").with_alias("millimeter").with_alias("millimeters"))?;

        // Imperial/US length units
        self.register(NewUnit::new("in", "inch", length, dec("0.0254")?).with_precision(3)
            .with_alias("inches").with_preferred_alias("inch"))?;
        self.register(NewUnit::new("ft", "foot", length, dec("0.3048")?).with_precision(3)
            .with_preferred_alias("foot").with_alias("feet"))?;
        self.register(NewUnit::new("yd", "yard", length, dec("0.9144")?).with_precision(3)
            .with_preferred_alias("yard").with_alias("yards"))?;
        self.register(NewUnit::new("mi", "mile", length, dec("1609.344")?).with_precision(4)
            .with_preferred_alias("mile").with_alias("miles"))?;
        Ok(())
    }

    fn register_mass_units(&self) -> Result<(), ConversionError> {
        let mass = self.unit_type("mass", "Mass")?.id;

        self.register(NewUnit::new("kg", "kilogram", mass, Number::one()).base().with_precision(3)
            .with_preferred_alias("kilogram").with_alias("kilograms").with_alias("kilo"))?;
        self.register(NewUnit::new("g", "gram", mass, dec("0.001")?).with_precision(1)
            .with_preferred_alias("gram").with_alias("grams"))?;
        self.register(NewUnit::new("mg", "milligram", mass, dec("0.000001")?).with_precision(0)
            .with_preferred_alias("milligram").with_alias("milligrams"))?;
        self.register(NewUnit::new("t", "tonne", mass, Number::from_i64(1000)).with_precision(6)
            .with_preferred_alias("tonne").with_alias("tonnes").with_alias("metric ton"))?;

        // Imperial/US mass units
        self.register(NewUnit::new("lb", "pound", mass, dec("0.45359237")?).with_precision(3)
            .with_preferred_alias("pound").with_alias("pounds").with_alias("lbs"))?;
        self.register(NewUnit::new("oz", "ounce", mass, dec("0.028349523125")?).with_precision(2)
            .with_preferred_alias("ounce").with_alias("ounces"))?;
        Ok(())
    }

    fn register_time_units(&self) -> Result<(), ConversionError> {
        let time = self.unit_type("time", "Time")?.id;

        self.register(NewUnit::new("s", "second", time, Number::one()).base().with_precision(3)
            .with_preferred_alias("second").with_alias("seconds").with_alias("sec"))?;
        self.register(NewUnit::new("min", "minute", time, Number::from_i64(60)).with_precision(3)
            .with_preferred_alias("minute").with_alias("minutes"))?;
        self.register(NewUnit::new("h", "hour", time, Number::from_i64(3600)).with_precision(4)
            .with_preferred_alias("hour").with_alias("hours").with_alias("hr"))?;
        self.register(NewUnit::new("d", "day", time, Number::from_i64(86400)).with_precision(5)
            .with_preferred_alias("day").with_alias("days"))?;
        Ok(())
    }

    fn register_volume_units(&self) -> Result<(), ConversionError> {
        let volume = self.unit_type("volume", "Volume")?.id;

        self.register(NewUnit::new("L", "litre", volume, Number::one()).base().with_precision(3)
            .with_preferred_alias("litre").with_alias("litres").with_alias("liter").with_alias("liters"))?;
        self.register(NewUnit::new("mL", "millilitre", volume, dec("0.001")?).with_precision(1)
            .with_preferred_alias("millilitre").with_alias("milliliter").with_alias("millilitres"))?;
        self.register(NewUnit::new("m3", "cubic metre", volume, Number::from_i64(1000)).with_precision(6)
            .with_preferred_alias("cubic metre").with_alias("cubic meter"))?;
        let gallon = self.register(NewUnit::new("gal", "US gallon", volume, dec("3.785411784")?).with_precision(4)
            .with_preferred_alias("gallon").with_alias("gallons"))?;

        // Calibrated override, preferred over the base-mediated path
        let litre = self.unit("L")?;
        self.store.insert_conversion(gallon.id, litre.id, dec("3.785411784")?, Number::zero(), Direction::Both)?;
        Ok(())
    }

    fn register_temperature_units(&self) -> Result<(), ConversionError> {
        let temperature = self.unit_type("temperature", "Temperature")?.id;

        // kelvin = value * factor + offset
        let five_ninths = Number::from_i64(5).checked_div(&Number::from_i64(9))?;
        let fahrenheit_offset = dec("459.67")?.mul(&five_ninths);

        self.register(NewUnit::new("K", "kelvin", temperature, Number::one()).base().with_precision(2)
            .with_preferred_alias("kelvin"))?;
        self.register(NewUnit::new("C", "degree Celsius", temperature, Number::one())
            .with_offset(dec("273.15")?).with_precision(2)
            .with_preferred_alias("celsius").with_alias("°C").with_alias("degC"))?;
        self.register(NewUnit::new("F", "degree Fahrenheit", temperature, five_ninths)
            .with_offset(fahrenheit_offset).with_precision(2)
            .with_preferred_alias("fahrenheit").with_alias("°F").with_alias("degF"))?;
        Ok(())
    }

    fn register_count_units(&self) -> Result<(), ConversionError> {
        let count = self.unit_type("count", "Count")?.id;

        let piece = self.register(NewUnit::new("pcs", "piece", count, Number::one()).base().with_precision(0)
            .with_preferred_alias("piece").with_alias("pieces").with_alias("ea").with_alias("each"))?;
        self.register(NewUnit::new("dozen", "dozen", count, Number::from_i64(12)).with_precision(2)
            .with_alias("dz"))?;
        let pack = self.register(NewUnit::new("pack", "pack of 6", count, Number::from_i64(6)).with_precision(2)
            .with_alias("six-pack"))?;
        let boxed = self.register(NewUnit::new("box", "box of 12", count, Number::from_i64(12)).with_precision(2)
            .with_alias("bx"))?;

        self.store.insert_packaging(piece.id, pack.id, Number::from_i64(6))?;
        self.store.insert_packaging(piece.id, boxed.id, Number::from_i64(12))?;
        Ok(())
    }

    fn register_compound_units(&self) -> Result<(), ConversionError> {
        let m = self.unit("m")?.id;
        let km = self.unit("km")?.id;
        let mi = self.unit("mi")?.id;
        let s = self.unit("s")?.id;
        let h = self.unit("h")?.id;
        let kg = self.unit("kg")?.id;
        let l = self.unit("L")?.id;
        let min = self.unit("min")?.id;

        self.store.insert_compound("metre per second", "m/s", &[(m, 1), (s, -1)])?;
        self.store.insert_compound("kilometre per hour", "km/h", &[(km, 1), (h, -1)])?;
        self.store.insert_compound("mile per hour", "mph", &[(mi, 1), (h, -1)])?;
        self.store.insert_compound("metre per second squared", "m/s^2", &[(m, 1), (s, -2)])?;
        self.store.insert_compound("newton", "kg*m/s^2", &[(kg, 1), (m, 1), (s, -2)])?;
        self.store.insert_compound("litre per minute", "L/min", &[(l, 1), (min, -1)])?;
        self.store.insert_compound("litre per hour", "L/h", &[(l, 1), (h, -1)])?;
        Ok(())
    }
}
