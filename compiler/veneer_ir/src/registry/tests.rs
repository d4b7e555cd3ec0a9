use super::*;
use pretty_assertions::assert_eq;

#[test]
fn interface_members_are_implicitly_abstract() {
    let mut registry = TypeRegistry::new();
    let greeter = registry
        .declare_interface("Greeter")
        .method("greet", &[("name", ValueType::Str)], ValueType::Str, Modifiers::empty())
        .finish()
        .unwrap();

    let decl = registry.get(greeter).unwrap();
    assert!(decl.is_interface());
    assert_eq!(decl.methods.len(), 1);
    let greet = &decl.methods[0];
    assert_eq!(greet.declaring, greeter);
    assert_eq!(registry.lookup(greet.name), "greet");
    assert!(greet.modifiers.contains(Modifiers::ABSTRACT));
    assert_eq!(greet.param_types().collect::<Vec<_>>(), vec![ValueType::Str]);
}

#[test]
fn property_accessors_follow_access() {
    let mut registry = TypeRegistry::new();
    let id = registry
        .declare_class("Person")
        .property("name", ValueType::Str, PropertyAccess::ReadWrite, Modifiers::VIRTUAL)
        .property("id", ValueType::Int, PropertyAccess::ReadOnly, Modifiers::VIRTUAL)
        .finish()
        .unwrap();

    let decl = registry.get(id).unwrap();
    let name = &decl.properties[0];
    let getter = name.getter.as_ref().unwrap();
    let setter = name.setter.as_ref().unwrap();
    assert_eq!(getter.kind, AccessorKind::Getter);
    assert!(getter.params.is_empty());
    assert_eq!(getter.ret, ValueType::Str);
    assert_eq!(setter.kind, AccessorKind::Setter);
    assert_eq!(setter.param_types().collect::<Vec<_>>(), vec![ValueType::Str]);
    assert_eq!(setter.ret, ValueType::Unit);

    let id_prop = &decl.properties[1];
    assert!(id_prop.setter.is_none());
    assert_eq!(id_prop.accessors().count(), 1);
}

#[test]
fn event_accessors_take_a_handler() {
    let mut registry = TypeRegistry::new();
    let id = registry
        .declare_interface("Notifier")
        .event("changed", Modifiers::empty())
        .finish()
        .unwrap();

    let event = &registry.get(id).unwrap().events[0];
    assert_eq!(event.add.kind, AccessorKind::Adder);
    assert_eq!(event.remove.kind, AccessorKind::Remover);
    for accessor in event.accessors() {
        assert_eq!(accessor.param_types().collect::<Vec<_>>(), vec![ValueType::Handler]);
    }
}

#[test]
fn duplicate_type_names_are_rejected() {
    let mut registry = TypeRegistry::new();
    registry.declare_interface("Greeter").finish().unwrap();
    let err = registry.declare_interface("Greeter").finish().unwrap_err();
    assert_eq!(err, RegistryError::DuplicateType("Greeter".to_owned()));
}

#[test]
fn duplicate_members_are_rejected() {
    let mut registry = TypeRegistry::new();
    let err = registry
        .declare_interface("Greeter")
        .method("greet", &[], ValueType::Str, Modifiers::empty())
        .method("greet", &[("name", ValueType::Str)], ValueType::Str, Modifiers::empty())
        .finish()
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateMember {
            type_name: "Greeter".to_owned(),
            kind: "method",
            member: "greet".to_owned(),
        }
    );
}

#[test]
fn base_must_be_a_class() {
    let mut registry = TypeRegistry::new();
    let iface = registry.declare_interface("Greeter").finish().unwrap();
    let err = registry.declare_class("Impl").base(iface).finish().unwrap_err();
    assert!(matches!(err, RegistryError::KindMismatch { expected: "a class", .. }));
}

#[test]
fn unknown_references_are_rejected() {
    let mut registry = TypeRegistry::new();
    let err = registry
        .declare_class("Impl")
        .implements(TypeId::from_raw(42))
        .finish()
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownType { .. }));
}

#[test]
fn lookup_by_name() {
    let mut registry = TypeRegistry::new();
    let id = registry.declare_class("Base").sealed().finish().unwrap();
    assert_eq!(registry.by_name("Base"), Some(id));
    assert_eq!(registry.by_name("Missing"), None);
    assert_eq!(registry.type_name(id), "Base");
    assert!(registry.get(id).unwrap().is_sealed());
    assert_eq!(registry.len(), 1);
}
