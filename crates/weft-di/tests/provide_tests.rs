//! Tests for registering constructors

use rstest::*;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use weft_di::{
	Alias, Constructor, Container, DiError, Key, Location, Outputs, ProvideInfoSink, ProvideOptions,
	Signature, Slot,
};

struct Logger;
struct Database;
struct Buffer(&'static str);

trait Reader: Send + Sync {
	fn read(&self) -> &'static str;
}

impl Reader for Buffer {
	fn read(&self) -> &'static str {
		self.0
	}
}

fn new_logger() -> Result<Logger, Infallible> {
	Ok(Logger)
}

#[fixture]
fn container() -> Container {
	Container::new()
}

#[rstest]
fn provide_does_not_call_constructor(container: Container) {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);

	// Act
	container
		.provide(move || -> Result<Logger, Infallible> {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(Logger)
		})
		.unwrap();

	// Assert
	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert_eq!(container.providers(&Key::of::<Logger>()).unwrap().len(), 1);
}

#[rstest]
fn constructor_without_outputs_is_rejected(container: Container) {
	// Arrange
	let ctor = Constructor::new(Signature::new(), |_| Ok(Outputs::new()))
		.with_function_name("app::setup");

	// Act
	let error = container.provide(ctor).unwrap_err();

	// Assert
	assert!(matches!(error, DiError::Provide { .. }));
	assert!(matches!(error.innermost(), DiError::NoResults { function } if function == "app::setup"));
	assert!(container.constructors().unwrap().is_empty());
}

#[rstest]
fn second_provider_of_same_key_is_rejected(container: Container) {
	// Arrange
	container.provide(new_logger).unwrap();

	// Act
	let error = container.provide(new_logger).unwrap_err();

	// Assert
	let DiError::AlreadyProvided { key, existing, .. } = error.innermost() else {
		panic!("unexpected error: {}", error);
	};
	assert_eq!(key, &Key::of::<Logger>());
	assert!(existing.contains("new_logger"), "{}", existing);
	assert_eq!(container.providers(&Key::of::<Logger>()).unwrap().len(), 1);
	assert_eq!(container.constructors().unwrap().len(), 1);
}

#[rstest]
fn names_distinguish_providers_of_one_type(container: Container) {
	// Act
	let primary = container.provide_with(
		|| -> Result<Database, Infallible> { Ok(Database) },
		ProvideOptions::new().name("primary"),
	);
	let replica = container.provide_with(
		|| -> Result<Database, Infallible> { Ok(Database) },
		ProvideOptions::new().name("replica"),
	);

	// Assert
	assert!(primary.is_ok());
	assert!(replica.is_ok());
	assert_eq!(
		container.providers(&Key::named::<Database>("primary")).unwrap().len(),
		1
	);
	assert!(container.providers(&Key::of::<Database>()).unwrap().is_empty());
}

#[rstest]
fn many_providers_may_join_one_group(container: Container) {
	// Act
	for _ in 0..3 {
		container
			.provide_with(new_logger, ProvideOptions::new().group("loggers"))
			.unwrap();
	}

	// Assert
	assert_eq!(
		container.providers(&Key::grouped::<Logger>("loggers")).unwrap().len(),
		3
	);
}

#[rstest]
#[case::name_and_group(ProvideOptions::new().name("a").group("b"), "cannot use named values with value groups")]
#[case::alias_and_group(
	ProvideOptions::new().group("b").alias(Alias::new::<Logger, Arc<Logger>, _>(|l| l)),
	"cannot use aliases with value groups"
)]
fn conflicting_options_are_rejected(
	container: Container,
	#[case] options: ProvideOptions,
	#[case] expected: &str,
) {
	// Act
	let error = container.provide_with(new_logger, options).unwrap_err();

	// Assert
	assert!(matches!(error.innermost(), DiError::InvalidOption(_)));
	assert!(error.to_string().contains(expected), "{}", error);
}

#[rstest]
fn invalid_signature_reports_the_slot(container: Container) {
	// Arrange
	let ctor = Constructor::new(
		Signature::new()
			.param(Slot::value::<Logger>().grouped("loggers"))
			.result(Slot::value::<Database>()),
		|_| Ok(Outputs::single(Database)),
	);

	// Act
	let error = container.provide(ctor).unwrap_err();

	// Assert
	let DiError::InvalidSignature { path, .. } = error.innermost() else {
		panic!("unexpected error: {}", error);
	};
	assert_eq!(path, "argument 0");
}

#[rstest]
fn fill_info_describes_accepted_constructor(container: Container) {
	// Arrange
	container.provide(new_logger).unwrap();
	let sink = ProvideInfoSink::new();
	let ctor = Constructor::new(
		Signature::new()
			.param(Slot::value::<Logger>())
			.param(Slot::value::<Buffer>().named("scratch").optional())
			.result(Slot::value::<Database>()),
		|_| Ok(Outputs::single(Database)),
	);

	// Act
	container
		.provide_with(ctor, ProvideOptions::new().fill_info(&sink))
		.unwrap();

	// Assert
	let info = sink.get().expect("info filled");
	assert_eq!(info.id.index(), 1);
	assert_eq!(info.inputs.len(), 2);
	assert!(info.inputs[1].is_optional());
	assert_eq!(info.inputs[1].key(), &Key::named::<Buffer>("scratch"));
	assert_eq!(info.outputs.len(), 1);
	assert_eq!(info.outputs[0].key(), &Key::of::<Database>());
}

#[rstest]
fn fill_info_is_untouched_on_failure(container: Container) {
	// Arrange
	container.provide(new_logger).unwrap();
	let sink = ProvideInfoSink::new();

	// Act
	let result = container.provide_with(new_logger, ProvideOptions::new().fill_info(&sink));

	// Assert
	assert!(result.is_err());
	assert!(sink.get().is_none());
}

#[rstest]
fn alias_exposes_value_under_trait_object(container: Container) {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	container
		.provide_with(
			move || -> Result<Buffer, Infallible> {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(Buffer("payload"))
			},
			ProvideOptions::new().alias(Alias::new::<Buffer, Arc<dyn Reader>, _>(|buffer| {
				buffer as Arc<dyn Reader>
			})),
		)
		.unwrap();

	// Act
	let mut read = "";
	container
		.invoke(|reader: Arc<Arc<dyn Reader>>, buffer: Arc<Buffer>| {
			read = reader.read();
			assert_eq!(buffer.0, "payload");
		})
		.unwrap();

	// Assert
	assert_eq!(read, "payload");
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn alias_cannot_collide_with_existing_key(container: Container) {
	// Arrange
	container
		.provide(|| -> Result<Arc<dyn Reader>, Infallible> { Ok(Arc::new(Buffer("other"))) })
		.unwrap();

	// Act
	let result = container.provide_with(
		|| -> Result<Buffer, Infallible> { Ok(Buffer("payload")) },
		ProvideOptions::new().alias(Alias::new::<Buffer, Arc<dyn Reader>, _>(|buffer| {
			buffer as Arc<dyn Reader>
		})),
	);

	// Assert
	let error = result.unwrap_err();
	assert!(matches!(error.innermost(), DiError::AlreadyProvided { .. }));
	assert!(container.providers(&Key::of::<Buffer>()).unwrap().is_empty());
}

#[rstest]
fn location_points_at_the_call_site(container: Container) {
	// Act
	container.provide(new_logger).unwrap();

	// Assert
	let constructors = container.constructors().unwrap();
	let location = &constructors[0].location;
	assert!(location.file().ends_with("provide_tests.rs"), "{}", location);
	assert!(location.function().ends_with("new_logger"), "{}", location);
}

#[rstest]
fn location_option_overrides_call_site(container: Container) {
	// Act
	container
		.provide_with(
			new_logger,
			ProvideOptions::new().location(Location::new("logging::init", "src/logging.rs", 7)),
		)
		.unwrap();

	// Assert
	let constructors = container.constructors().unwrap();
	assert_eq!(
		constructors[0].location,
		Location::new("logging::init", "src/logging.rs", 7)
	);
}

#[rstest]
fn known_types_are_sorted(container: Container) {
	// Arrange
	container.provide(new_logger).unwrap();
	container
		.provide(|| -> Result<Database, Infallible> { Ok(Database) })
		.unwrap();

	// Act
	let names: Vec<&str> = container
		.known_types()
		.unwrap()
		.iter()
		.map(|ty| ty.name())
		.collect();

	// Assert
	let mut sorted = names.clone();
	sorted.sort_unstable();
	assert_eq!(names, sorted);
	assert_eq!(names.len(), 2);
}

#[rstest]
fn empty_name_registers_the_unnamed_key(container: Container) {
	// Arrange
	container
		.provide_with(new_logger, ProvideOptions::new().name(""))
		.unwrap();
	container.invoke(|_: Arc<Logger>| {}).unwrap();

	// Act
	let by_empty_name = container.value(&Key::named::<Logger>("")).unwrap();

	// Assert
	assert!(by_empty_name.is_some());
	assert_eq!(container.providers(&Key::named::<Logger>("")).unwrap().len(), 1);
}
