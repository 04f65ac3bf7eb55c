//! Shared property types and modules for unit tests.
use crate::module::{Module, ModuleBuilder};
use crate::property_type::{FieldList, PropertyType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Area;

impl PropertyType for Area {
    type Inputs = (f64, f64);
    type Results = (f64,);

    fn inputs() -> FieldList {
        FieldList::new()
            .add::<f64>("base", "Length of the base")
            .add::<f64>("height", "Height of the shape")
    }

    fn results() -> FieldList {
        FieldList::new().add::<f64>("area", "The area")
    }
}

pub struct PrismVolume;

impl PropertyType for PrismVolume {
    type Inputs = (f64, f64, f64);
    type Results = (f64,);

    fn inputs() -> FieldList {
        FieldList::new()
            .add::<f64>("base", "Length of the base")
            .add::<f64>("height", "Height of the base")
            .add::<f64>("width", "Depth of the prism")
    }

    fn results() -> FieldList {
        FieldList::new().add::<f64>("volume", "The volume")
    }
}

pub struct EnergyCalc;

impl PropertyType for EnergyCalc {
    type Inputs = (Vec<f64>,);
    type Results = (f64,);

    fn inputs() -> FieldList {
        FieldList::new().add::<Vec<f64>>("geometry", "Flattened coordinates")
    }

    fn results() -> FieldList {
        FieldList::new().add::<f64>("energy", "Total energy")
    }
}

pub struct SomeAnalysis;

impl PropertyType for SomeAnalysis {
    type Inputs = (Vec<f64>,);
    type Results = (f64,);

    fn inputs() -> FieldList {
        FieldList::new().add::<Vec<f64>>("geometry", "Flattened coordinates")
    }

    fn results() -> FieldList {
        FieldList::new().add::<f64>("energy", "Energy reported by the analysis")
    }
}

pub fn rectangle() -> Module {
    ModuleBuilder::new("Rectangle")
        .description("Area of a rectangle")
        .citation("Euclid, Elements, Book I")
        .satisfies::<Area, _>(|(base, height), _| Ok((base * height,)))
        .build()
        .unwrap()
}

pub fn triangle() -> Module {
    ModuleBuilder::new("Triangle")
        .satisfies::<Area, _>(|(base, height), _| Ok((0.5 * base * height,)))
        .build()
        .unwrap()
}

pub fn scaled_rectangle() -> Module {
    ModuleBuilder::new("ScaledRectangle")
        .input_default::<f64>("scale", "Scale factor", 1.0)
        .satisfies::<Area, _>(|(base, height), ctx| Ok((base * height * ctx.input::<f64>("scale")?,)))
        .build()
        .unwrap()
}

/// Volume of a prism whose base area comes from the "area" submodule.
pub fn prism_volume() -> Module {
    ModuleBuilder::new("PrismVolumeBySubmod")
        .description("Computes the volume of a prism")
        .citation("Euclid, Elements, Book XI")
        .submodule::<Area>("area", "Area of the base")
        .satisfies::<PrismVolume, _>(|(base, height, width), ctx| {
            let (area,) = ctx.run_as::<Area>("area", (base, height))?;
            Ok((area * width,))
        })
        .build()
        .unwrap()
}

/// An energy module that counts how many times it actually executed.
pub fn counting_energy() -> (Module, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let module = ModuleBuilder::new("CountingEnergy")
        .satisfies::<EnergyCalc, _>(move |(geometry,), _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((geometry.iter().map(|x| x * x).sum::<f64>(),))
        })
        .build()
        .unwrap();
    (module, calls)
}

/// Delegates to the "energy" submodule, both as `SomeAnalysis` and as `EnergyCalc`.
pub fn analysis() -> Module {
    ModuleBuilder::new("Analysis")
        .submodule::<EnergyCalc>("energy", "Energy method")
        .satisfies::<SomeAnalysis, _>(|(geometry,), ctx| ctx.run_as::<EnergyCalc>("energy", (geometry,)))
        .satisfies::<EnergyCalc, _>(|(geometry,), ctx| ctx.run_as::<EnergyCalc>("energy", (geometry,)))
        .build()
        .unwrap()
}
