use nested_config::{config_schema, Config, FieldShape};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Dimensions {
    length: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct Garage {
    name: String,
    dimensions: Dimensions,
}

#[derive(Debug, Deserialize)]
struct House {
    name: String,
    dimensions: Dimensions,
    garage: Option<Garage>,
}

config_schema!(Dimensions {
    "length" => FieldShape::Scalar,
    "width" => FieldShape::Scalar,
    "height" => FieldShape::Scalar,
});

config_schema!(Garage {
    "name" => FieldShape::Scalar,
    "dimensions" => FieldShape::nested::<Dimensions>(),
});

config_schema!(House {
    "name" => FieldShape::Scalar,
    "dimensions" => FieldShape::nested::<Dimensions>(),
    "garage" => FieldShape::optional::<Garage>(),
});

fn main() -> Result<(), nested_config::Error> {
    // RUST_LOG=nested_config=debug shows each file as it is loaded.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let house: House = Config::builder()
        .with_file(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config/house.toml"))
        .build()?;

    let d = &house.dimensions;
    println!("{}: {}x{}x{}", house.name, d.length, d.width, d.height);
    if let Some(garage) = &house.garage {
        let d = &garage.dimensions;
        println!("  garage '{}': {}x{}x{}", garage.name, d.length, d.width, d.height);
    }

    Ok(())
}
