/// Declares a record whose fields are assigned positionally from a list of tokens, in the order
/// in which they are declared.
///
/// Each field type must implement `FromStr`. `String` fields are exposed as `&str`, any other field
/// type must be `Copy` and is returned by value.
macro_rules! fixed_record {
    (@accessor $(#[$field_meta:meta])* $field:ident: String) => {
        $(#[$field_meta])*
        pub fn $field(&self) -> &str {
            &self.$field
        }
    };
    (@accessor $(#[$field_meta:meta])* $field:ident: $ty:ident) => {
        $(#[$field_meta])*
        pub fn $field(&self) -> $ty {
            self.$field
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $format:literal {
            $($(#[$field_meta:meta])* $field:ident: $ty:ident,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $($field: $ty,)+
        }

        impl $name {
            /// Names of the fields, in the order in which they appear in the file
            pub const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn from_tokens<S>(tokens: &[S]) -> Result<Self, $crate::procfs::ProcfsError>
            where
                S: AsRef<str>,
            {
                $crate::procfs::parsers::check_arity($format, Self::FIELDS.len(), tokens.len())?;
                let mut tokens = tokens.iter().map(AsRef::as_ref);

                Ok($name {
                    $($field: $crate::procfs::parsers::parse_field($format, stringify!($field), tokens.next())?,)+
                })
            }

            $(fixed_record!(@accessor $(#[$field_meta])* $field: $ty);)+
        }
    };
}
