//! Prints the JSON schema of every object kind as a multi-document YAML stream.

use objects::{Deployment, Object, Pod, ReplicaSet};
use schemars::schema_for;

fn main() -> Result<(), serde_yaml::Error> {
    let schemas = [
        ("Deployment", schema_for!(Deployment)),
        ("ReplicaSet", schema_for!(ReplicaSet)),
        ("Pod", schema_for!(Pod)),
        ("Object", schema_for!(Object)),
    ];

    for (kind, schema) in schemas {
        println!("---");
        println!("# {kind}");
        print!("{}", serde_yaml::to_string(&schema)?);
    }

    Ok(())
}
