use lode_blocks::config::{BlockDef, BlocksConfig};
use lode_blocks::{BlockRegistry, RegistryError, RenderPhase, Shape, TintSource};
use proptest::prelude::*;

#[test]
fn builtin_phases_and_tints() {
    let reg = BlockRegistry::builtin().expect("builtin registry");
    let water = reg.get(reg.id_by_name("water").unwrap()).unwrap();
    assert_eq!(water.phase, RenderPhase::Translucent);
    assert_eq!(water.tint, TintSource::Water);
    assert!(water.cull_same);
    assert!(!water.occludes);

    let grass = reg.get(reg.id_by_name("tall_grass").unwrap()).unwrap();
    assert_eq!(grass.shape, Shape::Cross);
    // Cross shapes default to the cutout phase
    assert_eq!(grass.phase, RenderPhase::Transparent);

    let barrier = reg.get(reg.id_by_name("barrier").unwrap()).unwrap();
    assert!(!barrier.is_rendered());
}

#[test]
fn unknown_shape_is_rejected() {
    let err = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "odd"
        shape = "stairs"
    "#,
    )
    .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownShape { ref shape, .. } if shape == "stairs"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut a = BlockDef::named("a");
    a.id = Some(3);
    let mut b = BlockDef::named("b");
    b.id = Some(3);
    let err = BlockRegistry::from_config(BlocksConfig { blocks: vec![a, b] }).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateId { id: 3, .. }));
}

#[test]
fn duplicate_names_are_rejected() {
    let mut a = BlockDef::named("glass");
    a.id = Some(4);
    let mut b = BlockDef::named("glass");
    b.id = Some(9);
    let err = BlockRegistry::from_config(BlocksConfig { blocks: vec![a, b] }).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::DuplicateName { ref name, first: 4, second: 9 } if name == "glass"
    ));
}

#[test]
fn only_air_may_take_slot_zero() {
    let mut a = BlockDef::named("stone");
    a.id = Some(0);
    let err = BlockRegistry::from_config(BlocksConfig { blocks: vec![a] }).unwrap_err();
    assert!(matches!(err, RegistryError::AirSlot(ref n) if n == "stone"));
}

#[test]
fn malformed_toml_is_an_error() {
    let err = BlockRegistry::from_toml_str("[[blocks]]\nname = 3").unwrap_err();
    assert!(matches!(err, RegistryError::Toml(_)));
}

proptest! {
    // Every name resolves back to a type carrying that name and its own slot id
    #[test]
    fn names_resolve_to_their_slot(n in 1usize..40) {
        let blocks = (0..n).map(|i| BlockDef::named(&format!("b{i}"))).collect();
        let reg = BlockRegistry::from_config(BlocksConfig { blocks }).unwrap();
        for i in 0..n {
            let name = format!("b{i}");
            let id = reg.id_by_name(&name).unwrap();
            let ty = reg.get(id).unwrap();
            prop_assert_eq!(&ty.name, &name);
            prop_assert_eq!(ty.id, id);
            prop_assert!(id > 0);
        }
    }
}
