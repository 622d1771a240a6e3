mod common;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common::{FakePlatform, Fixture, fixture, fixture_with};
use crossbind::{
    BindingError, Callable, ConversionError, EngineConfig, EngineError, FieldDescriptor,
    InterfaceAdapter, ManagedProc, ManagedValue, NamespaceError, NativeArray, NativeMembers,
    NativeObject, NativeType, NativeValue, PrimitiveKind, ProviderError, ProxyKind, ProxyType,
    Resolution, ResolutionError, SubclassGenerator, SubclassPlan, TypeSig,
};
use parking_lot::Mutex;
use proptest::prelude::*;

const COUNTER: &str = "demo.Counter";
const FORMATTER: &str = "demo.text.Formatter";

fn prim(kind: PrimitiveKind) -> TypeSig {
    TypeSig::Primitive(kind)
}

fn counter_state(receiver: Option<&NativeObject>) -> Result<&Mutex<i64>, ProviderError> {
    receiver
        .and_then(|o| o.downcast_ref::<Mutex<i64>>())
        .ok_or_else(|| ProviderError::Invocation {
            member: "receiver".into(),
            detail: "not a counter".into(),
        })
}

/// A counter class with overloads, bean accessors, fields, and a static factory.
fn counter_platform() -> FakePlatform {
    let platform = FakePlatform::new();
    let long = prim(PrimitiveKind::Long);

    let new0 = Callable::constructor(COUNTER, vec![]);
    let new1 = Callable::constructor(COUNTER, vec![long.clone()]);
    let get_count = Callable::method(COUNTER, "getCount", vec![]).returning(long.clone());
    let increment = Callable::method(COUNTER, "increment", vec![]);
    let add_int = Callable::method(COUNTER, "add", vec![prim(PrimitiveKind::Int)]).returning(long.clone());
    let add_double =
        Callable::method(COUNTER, "add", vec![prim(PrimitiveKind::Double)]).returning(prim(PrimitiveKind::Double));
    let is_zero = Callable::method(COUNTER, "isZero", vec![]).returning(prim(PrimitiveKind::Boolean));
    let reset = Callable::method(COUNTER, "reset", vec![]);
    let of = Callable::method(COUNTER, "of", vec![long.clone()])
        .returning(TypeSig::object(COUNTER))
        .as_static();

    platform.define(
        NativeType::class(COUNTER),
        NativeMembers::new()
            .with_constructor(new0.clone())
            .with_constructor(new1.clone())
            .with_method(get_count.clone())
            .with_method(increment.clone())
            .with_method(add_int.clone())
            .with_method(add_double.clone())
            .with_method(is_zero.clone())
            .with_method(reset)
            .with_method(of.clone())
            .with_field(FieldDescriptor::new(COUNTER, "label", TypeSig::String))
            .with_field(FieldDescriptor::new(COUNTER, "LIMIT", long).as_static().as_final()),
    );

    let ty = platform.native(COUNTER);
    let make = move |start: i64| NativeValue::Object(NativeObject::new(Arc::clone(&ty), Mutex::new(start)));

    platform.on(&new0, {
        let make = make.clone();
        move |_, _| Ok(make(0))
    });
    platform.on(&new1, {
        let make = make.clone();
        move |_, args| Ok(make(args[0].as_i64().unwrap_or_default()))
    });
    platform.on(&of, move |_, args| Ok(make(args[0].as_i64().unwrap_or_default())));
    platform.on(&get_count, |receiver, _| Ok(NativeValue::Long(*counter_state(receiver)?.lock())));
    platform.on(&increment, |receiver, _| {
        *counter_state(receiver)?.lock() += 1;
        Ok(NativeValue::Null)
    });
    platform.on(&add_int, |receiver, args| {
        let mut count = counter_state(receiver)?.lock();
        *count += args[0].as_i64().unwrap_or_default();
        Ok(NativeValue::Long(*count))
    });
    platform.on(&add_double, |_, args| match args[0] {
        NativeValue::Double(d) => Ok(NativeValue::Double(d + 0.5)),
        _ => Ok(NativeValue::Null),
    });
    platform.on(&is_zero, |receiver, _| {
        Ok(NativeValue::Boolean(*counter_state(receiver)?.lock() == 0))
    });
    platform
}

/// `format(String)` and `format(String, Object...)`, plus `join(String)` and `join(String...)`.
fn formatter_platform() -> FakePlatform {
    let platform = FakePlatform::new();
    let format = Callable::method(FORMATTER, "format", vec![TypeSig::String])
        .returning(TypeSig::String)
        .as_static();
    let format_varargs = Callable::method(
        FORMATTER,
        "format",
        vec![TypeSig::String, TypeSig::array_of(TypeSig::root_object())],
    )
    .returning(TypeSig::String)
    .as_static()
    .as_varargs();
    let join = Callable::method(FORMATTER, "join", vec![TypeSig::String])
        .returning(TypeSig::String)
        .as_static();
    let join_varargs = Callable::method(FORMATTER, "join", vec![TypeSig::array_of(TypeSig::String)])
        .returning(TypeSig::String)
        .as_static()
        .as_varargs();
    let pair = Callable::method(FORMATTER, "pair", vec![TypeSig::String, TypeSig::String])
        .returning(TypeSig::String)
        .as_static();
    let pair_varargs = Callable::method(FORMATTER, "pair", vec![TypeSig::array_of(TypeSig::String)])
        .returning(TypeSig::String)
        .as_static()
        .as_varargs();

    platform.define(
        NativeType::class(FORMATTER),
        NativeMembers::new()
            .with_method(format.clone())
            .with_method(format_varargs.clone())
            .with_method(join.clone())
            .with_method(join_varargs.clone())
            .with_method(pair_varargs.clone())
            .with_method(pair.clone()),
    );
    platform.on(&format, |_, _| Ok(NativeValue::String("fixed".into())));
    platform.on(&format_varargs, |_, args| match &args[1] {
        NativeValue::Array(rest) => Ok(NativeValue::String(format!("varargs:{}", rest.len()).into())),
        _ => Ok(NativeValue::Null),
    });
    platform.on(&join, |_, _| Ok(NativeValue::String("fixed".into())));
    platform.on(&join_varargs, |_, _| Ok(NativeValue::String("varargs".into())));
    platform.on(&pair, |_, _| Ok(NativeValue::String("fixed".into())));
    platform.on(&pair_varargs, |_, _| Ok(NativeValue::String("varargs".into())));
    platform
}

fn shared() -> &'static Fixture {
    static SHARED: OnceLock<Fixture> = OnceLock::new();
    SHARED.get_or_init(|| fixture(counter_platform()))
}

// ============================================================================
// Construction, calls, and fields
// ============================================================================

#[test]
fn test_construct_and_call_by_alias() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[ManagedValue::Int(5)]).unwrap();

    assert_eq!(f.engine.call_method(&instance, "increment", &[]).unwrap(), ManagedValue::Nil);
    assert_eq!(f.engine.call_method(&instance, "getCount", &[]).unwrap(), ManagedValue::Int(6));
    assert_eq!(f.engine.call_method(&instance, "count", &[]).unwrap(), ManagedValue::Int(6));
    assert_eq!(f.engine.call_method(&instance, "get_count", &[]).unwrap(), ManagedValue::Int(6));
    assert_eq!(f.engine.call_method(&instance, "zero?", &[]).unwrap(), ManagedValue::Bool(false));

    let empty = f.engine.construct(&counter, &[]).unwrap();
    assert_eq!(f.engine.call_method(&empty, "is_zero", &[]).unwrap(), ManagedValue::Bool(true));
}

#[test]
fn test_overloads_follow_argument_shape() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    assert_eq!(
        f.engine.call_method(&instance, "add", &[ManagedValue::Int(4)]).unwrap(),
        ManagedValue::Int(4)
    );
    assert_eq!(
        f.engine.call_method(&instance, "add", &[ManagedValue::Float(1.0)]).unwrap(),
        ManagedValue::Float(1.5)
    );
}

#[test]
fn test_static_factory_returns_wrapped_instance() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();

    let made = f.engine.call_static(&counter, "of", &[ManagedValue::Int(3)]).unwrap();
    let instance = made.as_proxy().expect("factory result is a proxy");
    assert_eq!(instance.type_hash(), counter.type_hash());
    assert_eq!(f.engine.call_method(instance, "count", &[]).unwrap(), ManagedValue::Int(3));
}

#[test]
fn test_fields() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    f.engine
        .set_field(&counter, Some(&instance), "label", &ManagedValue::str("hits"))
        .unwrap();
    assert_eq!(
        f.engine.get_field(&counter, Some(&instance), "label").unwrap(),
        ManagedValue::str("hits")
    );
    assert_eq!(f.engine.get_field(&counter, None, "LIMIT").unwrap(), ManagedValue::Nil);
    let definition = f.runtime.definition(COUNTER).unwrap();
    assert_eq!(definition.constants, vec![("LIMIT".to_string(), NativeValue::Null)]);

    let err = f
        .engine
        .set_field(&counter, None, "LIMIT", &ManagedValue::Int(1))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::FinalField {
            type_name: COUNTER.into(),
            field: "LIMIT".into()
        }
    );
}

#[test]
fn test_constants_are_read_at_bind_time() {
    let platform = counter_platform();
    platform.set_static("LIMIT", NativeValue::Long(100));
    let f = fixture(platform);
    f.engine.proxy_type(COUNTER).unwrap();

    let definition = f.runtime.definition(COUNTER).unwrap();
    assert_eq!(definition.constants, vec![("LIMIT".to_string(), NativeValue::Long(100))]);
    assert!(definition.members.iter().any(|m| m == "LIMIT"));
}

#[test]
fn test_member_errors() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    let err = f.engine.call_method(&instance, "frobnicate", &[]).unwrap_err();
    assert!(matches!(err, EngineError::UnknownMember { kind: "method", .. }));
    assert!(err.is_not_found());

    let err = f
        .engine
        .call_method(&instance, "add", &[ManagedValue::Int(1), ManagedValue::Int(2)])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Resolution(ResolutionError::ArityMismatch { given: 2, .. })
    ));

    let err = f
        .engine
        .call_method(&instance, "add", &[ManagedValue::str("one")])
        .unwrap_err();
    assert!(matches!(err, EngineError::Resolution(ResolutionError::NoMatch { .. })));

    // Resolves to add(int), then fails to narrow.
    let err = f
        .engine
        .call_method(&instance, "add", &[ManagedValue::Int(1 << 40)])
        .unwrap_err();
    assert!(matches!(err, EngineError::Argument { position: 0, operation: "call", .. }));
    assert!(err.conversion().is_some_and(ConversionError::is_range_overflow));
    assert!(err.to_string().contains("demo.Counter.add"), "{}", err);

    // `reset` is declared but the platform has no implementation for it.
    let err = f.engine.call_method(&instance, "reset", &[]).unwrap_err();
    assert!(matches!(err, EngineError::Invocation { ref member, .. } if member.contains("reset")));

    let err = f.engine.get_field(&counter, None, "label").unwrap_err();
    assert!(matches!(err, EngineError::UnknownMember { kind: "static field", .. }));
}

// ============================================================================
// Proxy registry
// ============================================================================

#[test]
fn test_concurrent_first_use_builds_one_proxy() {
    let platform = FakePlatform::new();
    platform.define(NativeType::interface("demo.Sink"), NativeMembers::new());
    platform.define(
        NativeType::class("demo.SlowBase").with_interface("demo.Sink"),
        NativeMembers::new(),
    );
    platform.define(
        NativeType::class("demo.Slow").with_superclass("demo.SlowBase"),
        NativeMembers::new(),
    );
    platform.set_delay(Duration::from_millis(5));
    let f = fixture(platform);

    let proxies: Vec<Arc<ProxyType>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| s.spawn(|| f.engine.proxy_type("demo.Slow").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for proxy in &proxies {
        assert!(Arc::ptr_eq(proxy, &proxies[0]));
        assert!(proxy.is_finished() && proxy.is_complete());
        let base = proxy.super_proxy().unwrap();
        assert!(base.is_finished());
        assert!(base.interfaces()[0].is_finished());
    }
    assert_eq!(f.runtime.definitions_named("demo.Slow"), 1);
    assert_eq!(f.runtime.definitions_named("demo.SlowBase"), 1);
    assert_eq!(f.runtime.definitions_named("demo.Sink"), 1);
}

#[test]
fn test_recursive_interfaces_from_many_threads() {
    let platform = FakePlatform::new();
    platform.define(
        NativeType::interface("demo.Left").with_interface("demo.Right"),
        NativeMembers::new(),
    );
    platform.define(
        NativeType::interface("demo.Right").with_interface("demo.Left"),
        NativeMembers::new(),
    );
    platform.set_delay(Duration::from_millis(1));
    let f = fixture(platform);

    let proxies: Vec<Arc<ProxyType>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let name = if i % 2 == 0 { "demo.Left" } else { "demo.Right" };
                let engine = &f.engine;
                s.spawn(move || engine.proxy_type(name).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for proxy in &proxies {
        assert!(proxy.is_finished() && proxy.is_complete());
        assert_eq!(proxy.kind(), ProxyKind::Interface);
        let other = &proxy.interfaces()[0];
        assert!(Arc::ptr_eq(&other.interfaces()[0], proxy));
    }
    let left = f.engine.proxy_type("demo.Left").unwrap();
    assert!(Arc::ptr_eq(&left, &proxies[0]));
}

#[test]
fn test_missing_supertype_is_retryable() {
    let platform = FakePlatform::new();
    platform.define(
        NativeType::class("demo.Child").with_superclass("demo.Parent"),
        NativeMembers::new(),
    );
    let f = fixture(platform);

    let err = f.engine.proxy_type("demo.Child").unwrap_err();
    assert_eq!(
        err,
        EngineError::Binding(BindingError::TypeNotFound {
            type_name: "demo.Parent".into(),
            operation: "superclass",
        })
    );

    f.platform
        .define(NativeType::class("demo.Parent"), NativeMembers::new());
    let child = f.engine.proxy_type("demo.Child").unwrap();
    assert_eq!(child.super_proxy().unwrap().name(), "demo.Parent");
}

// ============================================================================
// Overload resolution
// ============================================================================

#[test]
fn test_varargs_selection() {
    let f = fixture(formatter_platform());
    let formatter = f.engine.proxy_type(FORMATTER).unwrap();

    let one = f
        .engine
        .call_static(&formatter, "format", &[ManagedValue::str("x")])
        .unwrap();
    assert_eq!(one, ManagedValue::str("fixed"));

    let three = f
        .engine
        .call_static(
            &formatter,
            "format",
            &[ManagedValue::str("x"), ManagedValue::Int(1), ManagedValue::Bool(true)],
        )
        .unwrap();
    assert_eq!(three, ManagedValue::str("varargs:2"));
}

#[test]
fn test_fixed_arity_beats_equal_varargs() {
    let f = fixture(formatter_platform());
    let formatter = f.engine.proxy_type(FORMATTER).unwrap();

    for _ in 0..2 {
        let result = f
            .engine
            .call_static(&formatter, "join", &[ManagedValue::str("a")])
            .unwrap();
        assert_eq!(result, ManagedValue::str("fixed"));
    }
    let result = f
        .engine
        .call_static(&formatter, "join", &[ManagedValue::str("a"), ManagedValue::str("b")])
        .unwrap();
    assert_eq!(result, ManagedValue::str("varargs"));
}

#[test]
fn test_two_fixed_parameters_beat_varargs() {
    let f = fixture(formatter_platform());
    let formatter = f.engine.proxy_type(FORMATTER).unwrap();
    let two = [ManagedValue::str("a"), ManagedValue::str("b")];

    let result = f.engine.call_static(&formatter, "pair", &two).unwrap();
    assert_eq!(result, ManagedValue::str("fixed"));

    let result = f
        .engine
        .call_static(&formatter, "pair", &[ManagedValue::str("a"), ManagedValue::str("b"), ManagedValue::str("c")])
        .unwrap();
    assert_eq!(result, ManagedValue::str("varargs"));

    let result = f.engine.call_static(&formatter, "pair", &[ManagedValue::str("a")]).unwrap();
    assert_eq!(result, ManagedValue::str("varargs"));
}

#[test]
fn test_interface_defaults_join_class_overloads() {
    let platform = FakePlatform::new();
    let describe_text = Callable::method("demo.Named", "describe", vec![TypeSig::String])
        .returning(TypeSig::String);
    let describe_int = Callable::method("demo.Tag", "describe", vec![prim(PrimitiveKind::Int)])
        .returning(TypeSig::String);
    platform.define(
        NativeType::interface("demo.Named"),
        NativeMembers::new().with_method(describe_text.clone()),
    );
    platform.define(
        NativeType::class("demo.Tag").with_interface("demo.Named"),
        NativeMembers::new()
            .with_constructor(Callable::constructor("demo.Tag", vec![]))
            .with_method(describe_int.clone()),
    );
    platform.on(&describe_text, |_, _| Ok(NativeValue::String("default".into())));
    platform.on(&describe_int, |_, _| Ok(NativeValue::String("own".into())));
    let f = fixture(platform);

    let tag = f.engine.proxy_type("demo.Tag").unwrap();
    let instance = f.engine.construct(&tag, &[]).unwrap();
    let result = f
        .engine
        .call_method(&instance, "describe", &[ManagedValue::str("x")])
        .unwrap();
    assert_eq!(result, ManagedValue::str("default"));
    let result = f.engine.call_method(&instance, "describe", &[ManagedValue::Int(1)]).unwrap();
    assert_eq!(result, ManagedValue::str("own"));
}

#[test]
fn test_resolution_is_deterministic_and_cached() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();
    let add = counter.find_method("add").unwrap();

    let args = [ManagedValue::Int(1)];
    let context = crossbind_dispatch::ResolveContext::new(f.engine.registry().hierarchy().as_ref());
    let first = add.resolve(&args, context).unwrap();
    assert_eq!(add.cache().len(), 1);

    for _ in 0..10 {
        f.engine.call_method(&instance, "add", &args).unwrap();
    }
    let again = add.resolve(&args, context).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(add.cache().len(), 1);
    assert_eq!(first.params, vec![prim(PrimitiveKind::Int)]);
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_narrowing_overflow() {
    let engine = &shared().engine;
    let byte = prim(PrimitiveKind::Byte);

    let err = engine.to_native(&ManagedValue::Int(300), &byte).unwrap_err();
    assert!(matches!(err, EngineError::Conversion(ref e) if e.is_range_overflow()));

    let value = engine.to_native(&ManagedValue::Int(100), &byte).unwrap();
    assert_eq!(value, NativeValue::Byte(100));
    assert_eq!(engine.to_managed(&value).unwrap(), ManagedValue::Int(100));
}

#[test]
fn test_nil_conversion() {
    let engine = &shared().engine;
    assert_eq!(
        engine.to_native(&ManagedValue::Nil, &TypeSig::String).unwrap(),
        NativeValue::Null
    );
    let err = engine
        .to_native(&ManagedValue::Nil, &prim(PrimitiveKind::Int))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conversion(ConversionError::NullToPrimitive { .. })
    ));
}

#[test]
fn test_array_elements() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    let counters = NativeArray::new(
        TypeSig::object(COUNTER),
        vec![NativeValue::Object(instance.object().clone()), NativeValue::Null],
    );
    let first = f.engine.array_get(&counters, 0).unwrap();
    assert!(first.as_proxy().is_some_and(|p| p.object().same(instance.object())));
    assert_eq!(f.engine.array_get(&counters, 1).unwrap(), ManagedValue::Nil);

    let shorts = NativeArray::new(prim(PrimitiveKind::Short), vec![NativeValue::Short(0); 2]);
    f.engine.array_set(&shorts, 1, &ManagedValue::Int(7)).unwrap();
    assert_eq!(shorts.get(1), Some(NativeValue::Short(7)));
    let err = f.engine.array_set(&shorts, 2, &ManagedValue::Int(7)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conversion(ConversionError::IndexOutOfBounds { .. })
    ));
}

proptest! {
    #[test]
    fn prop_int_round_trip(v in any::<i32>()) {
        let engine = &shared().engine;
        let native = engine.to_native(&ManagedValue::Int(v.into()), &prim(PrimitiveKind::Int)).unwrap();
        prop_assert_eq!(&native, &NativeValue::Int(v));
        prop_assert_eq!(engine.to_managed(&native).unwrap(), ManagedValue::Int(v.into()));
    }

    #[test]
    fn prop_short_and_char_round_trip(s in any::<i16>(), c in any::<u16>()) {
        let engine = &shared().engine;
        let native = engine.to_native(&ManagedValue::Int(s.into()), &prim(PrimitiveKind::Short)).unwrap();
        prop_assert_eq!(engine.to_managed(&native).unwrap(), ManagedValue::Int(s.into()));
        let native = engine.to_native(&ManagedValue::Int(c.into()), &prim(PrimitiveKind::Char)).unwrap();
        prop_assert_eq!(engine.to_managed(&native).unwrap(), ManagedValue::Int(c.into()));
    }

    #[test]
    fn prop_double_round_trip(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let engine = &shared().engine;
        let native = engine.to_native(&ManagedValue::Float(v), &prim(PrimitiveKind::Double)).unwrap();
        prop_assert_eq!(engine.to_managed(&native).unwrap(), ManagedValue::Float(v));
    }

    #[test]
    fn prop_bool_round_trip(b in any::<bool>()) {
        let engine = &shared().engine;
        let native = engine.to_native(&ManagedValue::Bool(b), &prim(PrimitiveKind::Boolean)).unwrap();
        prop_assert_eq!(engine.to_managed(&native).unwrap(), ManagedValue::Bool(b));
    }

    #[test]
    fn prop_string_round_trip(s in "\\PC{0,32}") {
        let engine = &shared().engine;
        let native = engine.to_native(&ManagedValue::str(&s), &TypeSig::String).unwrap();
        let ManagedValue::String(back) = engine.to_managed(&native).unwrap() else {
            panic!("expected a string");
        };
        prop_assert_eq!(&back.bytes[..], s.as_bytes());
    }

    #[test]
    fn prop_byte_range(v in -1000i64..1000) {
        let engine = &shared().engine;
        let result = engine.to_native(&ManagedValue::Int(v), &prim(PrimitiveKind::Byte));
        prop_assert_eq!(result.is_ok(), i8::try_from(v).is_ok());
    }
}

// ============================================================================
// Identity cache
// ============================================================================

#[test]
fn test_wrapping_without_identity_cache() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    let again = f.engine.wrap(instance.object(), false).unwrap();
    assert!(!again.same(&instance));
    assert!(again.object().same(instance.object()));
    assert!(f.engine.identity_cache().is_empty());

    let forced = f.engine.wrap(instance.object(), true).unwrap();
    let forced_again = f.engine.wrap(instance.object(), true).unwrap();
    assert!(forced.same(&forced_again));
}

#[test]
fn test_wrapping_with_identity_cache() {
    let f = fixture_with(
        counter_platform(),
        EngineConfig::default().with_object_proxy_cache(true),
    );
    let counter = f.engine.proxy_type(COUNTER).unwrap();
    let instance = f.engine.construct(&counter, &[]).unwrap();

    let again = f.engine.wrap(instance.object(), false).unwrap();
    assert!(again.same(&instance));
    let as_value = f
        .engine
        .to_managed(&NativeValue::Object(instance.object().clone()))
        .unwrap();
    assert!(as_value.as_proxy().is_some_and(|p| p.same(&instance)));
    assert_eq!(f.runtime.allocations(), 1);
}

// ============================================================================
// Namespace tree
// ============================================================================

#[test]
fn test_dotted_paths() {
    let f = fixture(formatter_platform());

    let Resolution::Package(demo) = f.engine.resolve_path("demo").unwrap() else {
        panic!("demo should be a package");
    };
    assert_eq!(demo.full_name(), "demo");

    let ty = f.engine.resolve_path("demo.text.Formatter").unwrap();
    let formatter = f.engine.proxy_type(FORMATTER).unwrap();
    assert!(ty.as_type().is_some_and(|t| Arc::ptr_eq(t, &formatter)));

    assert!(f.engine.resolve_path("demo.text.Missing").unwrap().is_not_found());
    assert!(matches!(
        f.engine.resolve_path("demo..text"),
        Err(EngineError::Namespace(NamespaceError::EmptySegment { .. }))
    ));

    let Resolution::Type(int) = f.engine.resolve_path("int").unwrap() else {
        panic!("int should bind at the top level");
    };
    assert_eq!(int.kind(), ProxyKind::Primitive);
    assert!(matches!(
        f.engine.resolve_path("demo.int"),
        Err(EngineError::Namespace(NamespaceError::ReservedNameConflict { .. }))
    ));
}

#[test]
fn test_concurrent_path_resolution() {
    let f = fixture(formatter_platform());

    let results: Vec<Resolution> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..12)
            .map(|_| s.spawn(|| f.engine.resolve_path("demo.text.Formatter").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let packages = f.engine.namespaces().package_count();

    let first = results[0].as_type().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(result.as_type().unwrap(), first));
    }
    let Resolution::Package(text) = f.engine.resolve_path("demo.text").unwrap() else {
        panic!("demo.text should be a package");
    };
    assert_eq!(text.full_name(), "demo.text");
    assert_eq!(f.engine.namespaces().package_count(), packages);
}

#[test]
fn test_denied_type_surfaces_through_namespace() {
    let platform = FakePlatform::new();
    platform.define(NativeType::class("demo.Secret"), NativeMembers::new());
    platform.define(NativeType::class("demo.Open"), NativeMembers::new());
    platform.deny("demo.Secret");
    let f = fixture(platform);

    let err = f.engine.resolve_path("demo.Secret").unwrap_err();
    assert_eq!(
        err,
        EngineError::Namespace(NamespaceError::Binding(BindingError::SecurityDenied {
            type_name: "demo.Secret".into(),
            operation: "load",
        }))
    );
    assert!(f.engine.resolve_path("demo.Open").unwrap().as_type().is_some());
}

// ============================================================================
// Duck typing
// ============================================================================

struct ProcAdapter {
    platform: Arc<FakePlatform>,
}

impl InterfaceAdapter for ProcAdapter {
    fn adapt(&self, value: &ManagedValue, interface: &TypeSig) -> Result<NativeObject, ProviderError> {
        match value {
            ManagedValue::Proc(proc) => Ok(NativeObject::new(self.platform.native(&interface.name()), proc.id)),
            other => Err(ProviderError::Invocation {
                member: interface.name(),
                detail: format!("cannot adapt {}", other.type_name()),
            }),
        }
    }
}

fn bus_platform() -> FakePlatform {
    let platform = FakePlatform::new();
    let subscribe = Callable::method("demo.Bus", "subscribe", vec![TypeSig::interface("demo.Listener")])
        .returning(prim(PrimitiveKind::Long))
        .as_static();
    platform.define(
        NativeType::interface("demo.Listener"),
        NativeMembers::new().with_method(Callable::method(
            "demo.Listener",
            "onEvent",
            vec![TypeSig::String],
        )),
    );
    platform.define(
        NativeType::class("demo.Bus"),
        NativeMembers::new().with_method(subscribe.clone()),
    );
    platform.on(&subscribe, |_, args| {
        let id = args[0]
            .as_object()
            .and_then(|o| o.downcast_ref::<u64>())
            .copied()
            .unwrap_or_default();
        Ok(NativeValue::Long(id as i64))
    });
    platform
}

#[test]
fn test_duck_typed_callable_argument() {
    let block = ManagedValue::Proc(ManagedProc { id: 42, arity: 1 });

    let f = fixture(bus_platform());
    let bus = f.engine.proxy_type("demo.Bus").unwrap();
    let err = f
        .engine
        .call_static(&bus, "subscribe", std::slice::from_ref(&block))
        .unwrap_err();
    assert!(matches!(err, EngineError::Resolution(ResolutionError::NoMatch { .. })));

    let Fixture { platform, engine, .. } = fixture(bus_platform());
    let engine = engine.with_adapter(Arc::new(ProcAdapter { platform }));
    let bus = engine.proxy_type("demo.Bus").unwrap();
    assert_eq!(
        engine.call_static(&bus, "subscribe", &[block]).unwrap(),
        ManagedValue::Int(42)
    );
}

// ============================================================================
// Managed subclasses
// ============================================================================

struct PlatformGenerator {
    platform: Arc<FakePlatform>,
}

impl SubclassGenerator for PlatformGenerator {
    fn generate(&self, plan: &SubclassPlan) -> Result<Arc<NativeType>, ProviderError> {
        let mut ty = NativeType::class(plan.name.as_str()).with_superclass(plan.parent.name());
        for iface in &plan.interfaces {
            ty = ty.with_interface(iface.name());
        }
        self.platform.define(
            ty,
            NativeMembers::new().with_constructor(Callable::constructor(&plan.name, vec![])),
        );
        Ok(self.platform.native(&plan.name))
    }
}

#[test]
fn test_final_types_reject_subclasses() {
    let platform = counter_platform();
    platform.define(NativeType::class("demo.Sealed").as_final(), NativeMembers::new());
    let f = fixture(platform);

    let sealed = f.engine.proxy_type("demo.Sealed").unwrap();
    let err = f
        .engine
        .plan_subclass(&sealed, "managed.MySealed", &[], &[])
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Binding(BindingError::FinalTypeExtension {
            type_name: "demo.Sealed".into(),
            subclass: "managed.MySealed".into(),
        })
    );
    assert!(f.runtime.definition("managed.MySealed").is_none());
}

#[test]
fn test_realized_subclass_caches_instances() {
    let f = fixture(counter_platform());
    let counter = f.engine.proxy_type(COUNTER).unwrap();

    let plan = f
        .engine
        .plan_subclass(&counter, "managed.TallyCounter", &["getCount", "increment"], &[])
        .unwrap();
    assert!(plan.overrides("getCount"));
    assert!(!plan.overrides("add"));

    let generator = PlatformGenerator {
        platform: Arc::clone(&f.platform),
    };
    let tally = f.engine.realize_subclass(&plan, &generator).unwrap();
    assert!(tally.caches_instances());
    assert!(Arc::ptr_eq(tally.super_proxy().unwrap(), &counter));
    assert!(tally.find_method("add").is_some());

    let instance = f.engine.construct(&tally, &[]).unwrap();
    let again = f.engine.wrap(instance.object(), false).unwrap();
    assert!(again.same(&instance));
}
