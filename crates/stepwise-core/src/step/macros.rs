//! Macro utilitaria para declarar contracts sin boilerplate.
//!
//! Exportada en la raíz del crate:
//!   use stepwise_core::contract;

/// Declara un struct contract con su esquema y su cuerpo.
///
/// ```ignore
/// contract! {
///     pub struct Splitter {
///         options { sentence: types::string() }
///         returns: OptionSchema::new().key("words", types::array_of(types::string()));
///         call(_self, scope) {
///             let sentence: String = scope.fetch("sentence")?;
///             let words: Vec<&str> = sentence.split(' ').collect();
///             scope.option(serde_json::json!({ "words": words }))
///         }
///     }
/// }
/// let splitter = Splitter::new()?;
/// ```
///
/// `options` y `returns` son opcionales. `new()` devuelve `Err` si alguna
/// declaración es inválida (nombre reservado o redeclaración incompatible).
#[macro_export]
macro_rules! contract {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( options { $($opt:ident : $ty:expr),* $(,)? } )?
            $( returns: $ret:expr; )?
            call($self_ident:ident, $scope:ident) $body:block
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            schema: $crate::contract::ContractSchema,
        }

        impl $name {
            pub fn new() -> ::std::result::Result<Self, $crate::errors::FlowError> {
                #[allow(unused_mut)]
                let mut builder = $crate::contract::ContractSchema::builder(stringify!($name));
                $( $( builder = builder.option(stringify!($opt), $ty); )* )?
                $( builder = builder.returns($ret); )?
                ::std::result::Result::Ok(Self { schema: builder.build()? })
            }
        }

        impl $crate::contract::Contract for $name {
            fn schema(&self) -> &$crate::contract::ContractSchema {
                &self.schema
            }

            #[allow(unused_variables)]
            fn call(&self, $scope: &mut $crate::contract::Scope<'_>) -> $crate::signal::Flow {
                let $self_ident = self;
                $body
            }
        }
    };
}
