//! Constructors and invocation targets
//!
//! [`Constructor`] and [`Invocation`] are the erased forms the container
//! stores: an explicit [`Signature`] plus a function over [`Arguments`].
//! Ordinary closures and `fn` items convert into them through
//! [`IntoConstructor`] and [`IntoInvocation`] when every parameter is a
//! [`Dependency`].

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::args::{Arguments, Outputs};
use crate::descriptor::{Signature, Slot};
use crate::error::{BoxError, DiResult};
use crate::key::Value;

pub(crate) type ConstructorFn = Arc<dyn Fn(Arguments) -> Result<Outputs, BoxError> + Send + Sync>;

type InvocationFn<'a> = Box<dyn FnOnce(Arguments) -> Result<(), BoxError> + 'a>;

/// A function that produces values, with its declared signature.
pub struct Constructor {
	signature: Signature,
	func: ConstructorFn,
	function: String,
}

impl Constructor {
	/// Wraps an erased function.
	///
	/// # Examples
	///
	/// ```
	/// use weft_di::{Constructor, Outputs, Signature, Slot};
	///
	/// struct Port(u16);
	///
	/// let ctor = Constructor::new(
	/// 	Signature::new().result(Slot::value::<Port>().named("http")),
	/// 	|_args| Ok(Outputs::single(Port(8080))),
	/// );
	/// assert_eq!(ctor.signature().results().len(), 1);
	/// ```
	pub fn new<F>(signature: Signature, func: F) -> Self
	where
		F: Fn(Arguments) -> Result<Outputs, BoxError> + Send + Sync + 'static,
	{
		Self {
			signature,
			func: Arc::new(func),
			function: type_name::<F>().to_string(),
		}
	}

	/// A constructor that hands out an existing value.
	pub fn supply<T: Any + Send + Sync>(value: T) -> Self {
		let value: Value = Arc::new(value);
		Self::new(Signature::new().result(Slot::value::<T>()), move |_| {
			Ok(Outputs::new().with_value(value.clone()))
		})
		.with_function_name(format!("supply<{}>", type_name::<T>()))
	}

	pub fn with_function_name(mut self, function: impl Into<String>) -> Self {
		self.function = function.into();
		self
	}

	pub fn signature(&self) -> &Signature {
		&self.signature
	}

	pub fn function_name(&self) -> &str {
		&self.function
	}

	pub(crate) fn into_parts(self) -> (Signature, ConstructorFn, String) {
		(self.signature, self.func, self.function)
	}
}

impl fmt::Debug for Constructor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Constructor")
			.field("function", &self.function)
			.field("signature", &self.signature)
			.finish()
	}
}

/// A function run once by `invoke` with resolved arguments.
pub struct Invocation<'a> {
	params: Vec<Slot>,
	func: InvocationFn<'a>,
	function: String,
}

impl<'a> Invocation<'a> {
	pub fn new<F>(params: Vec<Slot>, func: F) -> Self
	where
		F: FnOnce(Arguments) -> Result<(), BoxError> + 'a,
	{
		Self {
			params,
			func: Box::new(func),
			function: type_name::<F>().to_string(),
		}
	}

	pub fn with_function_name(mut self, function: impl Into<String>) -> Self {
		self.function = function.into();
		self
	}

	pub fn params(&self) -> &[Slot] {
		&self.params
	}

	pub fn function_name(&self) -> &str {
		&self.function
	}

	pub(crate) fn into_parts(self) -> (Vec<Slot>, InvocationFn<'a>, String) {
		(self.params, self.func, self.function)
	}
}

/// A parameter type that typed functions may declare.
///
/// `Arc<T>` is a required value of type `T`; `Option<Arc<T>>` is an optional
/// one that is `None` when nothing provides it.
pub trait Dependency: Sized + 'static {
	fn slot() -> Slot;

	fn extract(args: &Arguments, index: usize) -> DiResult<Self>;
}

impl<T: Any + Send + Sync> Dependency for Arc<T> {
	fn slot() -> Slot {
		Slot::value::<T>()
	}

	fn extract(args: &Arguments, index: usize) -> DiResult<Self> {
		args.get::<T>(index)
	}
}

impl<T: Any + Send + Sync> Dependency for Option<Arc<T>> {
	fn slot() -> Slot {
		Slot::value::<T>().optional()
	}

	fn extract(args: &Arguments, index: usize) -> DiResult<Self> {
		args.get_optional::<T>(index)
	}
}

/// Conversion into a [`Constructor`].
///
/// `M` only disambiguates the implementations and is inferred.
pub trait IntoConstructor<M> {
	fn into_constructor(self) -> Constructor;
}

impl IntoConstructor<Constructor> for Constructor {
	fn into_constructor(self) -> Constructor {
		self
	}
}

/// What an invoked function may return.
pub trait InvokeOutcome {
	fn into_outcome(self) -> Result<(), BoxError>;
}

impl InvokeOutcome for () {
	fn into_outcome(self) -> Result<(), BoxError> {
		Ok(())
	}
}

impl<E: Into<BoxError>> InvokeOutcome for Result<(), E> {
	fn into_outcome(self) -> Result<(), BoxError> {
		self.map_err(Into::into)
	}
}

/// Conversion into an [`Invocation`].
pub trait IntoInvocation<'a, M> {
	fn into_invocation(self) -> Invocation<'a>;
}

impl<'a> IntoInvocation<'a, Invocation<'a>> for Invocation<'a> {
	fn into_invocation(self) -> Invocation<'a> {
		self
	}
}

macro_rules! impl_typed_functions {
	($($ty:ident),*) => {
		impl<F, T, E, $($ty,)*> IntoConstructor<fn($($ty,)*) -> Result<T, E>> for F
		where
			F: Fn($($ty),*) -> Result<T, E> + Send + Sync + 'static,
			T: Any + Send + Sync,
			E: Into<BoxError> + 'static,
			$($ty: Dependency,)*
		{
			#[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
			fn into_constructor(self) -> Constructor {
				let mut signature = Signature::new();
				$(signature = signature.param(<$ty as Dependency>::slot());)*
				signature = signature.result(Slot::value::<T>());
				let function = self;
				Constructor::new(signature, move |args: Arguments| {
					let mut index = 0;
					$(
						let $ty = <$ty as Dependency>::extract(&args, index)?;
						index += 1;
					)*
					let value = function($($ty),*).map_err(Into::into)?;
					Ok(Outputs::single(value))
				})
				.with_function_name(type_name::<F>())
			}
		}

		impl<'a, F, R, $($ty,)*> IntoInvocation<'a, fn($($ty,)*) -> R> for F
		where
			F: FnOnce($($ty),*) -> R + 'a,
			R: InvokeOutcome + 'a,
			$($ty: Dependency,)*
		{
			#[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
			fn into_invocation(self) -> Invocation<'a> {
				let mut params = Vec::new();
				$(params.push(<$ty as Dependency>::slot());)*
				let function = self;
				Invocation::new(params, move |args: Arguments| {
					let mut index = 0;
					$(
						let $ty = <$ty as Dependency>::extract(&args, index)?;
						index += 1;
					)*
					function($($ty),*).into_outcome()
				})
				.with_function_name(type_name::<F>())
			}
		}
	};
}

impl_typed_functions!();
impl_typed_functions!(A1);
impl_typed_functions!(A1, A2);
impl_typed_functions!(A1, A2, A3);
impl_typed_functions!(A1, A2, A3, A4);
impl_typed_functions!(A1, A2, A3, A4, A5);
impl_typed_functions!(A1, A2, A3, A4, A5, A6);
