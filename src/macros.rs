/// Declares an entity struct together with its [`Model`](crate::entity::Model) impl.
///
/// The struct gets a private `Id` field assigned on construction. Each declared field
/// becomes a column named after the field in PascalCase; fields of type
/// [`Reference<T>`](crate::entity::Reference) are stored as `<Name>Id`.
///
/// ```ignore
/// unitorm::entity! {
///     pub struct Person {
///         pub name: String,
///         pub age: i64,
///         pub city: Reference<City>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            id: $crate::entity::EntityId,
            $( $(#[$field_meta])* $field_vis $field: $field_ty, )*
        }

        impl $name {
            /// Creates an instance with a fresh identifier and default field values.
            pub fn new() -> Self {
                <Self as $crate::entity::Model>::with_id($crate::entity::EntityId::new())
            }

            pub fn id(&self) -> $crate::entity::EntityId {
                self.id
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::entity::Model for $name {
            const TABLE: &'static str = stringify!($name);

            fn fields() -> &'static [$crate::entity::Field<Self>] {
                $crate::paste::paste! {
                    static FIELDS: &[$crate::entity::Field<$name>] = &[
                        $crate::entity::Field {
                            meta: $crate::entity::FieldMeta::new(
                                $crate::entity::ID_FIELD,
                                $crate::entity::FieldKind::Scalar,
                            ),
                            get: |entity: &$name| {
                                $crate::entity::FieldType::to_value(&entity.id)
                            },
                            set: |entity: &mut $name, value: $crate::core::Value| {
                                entity.id = <$crate::entity::EntityId as $crate::entity::FieldType>::from_value(value)?;
                                Ok(())
                            },
                        },
                        $(
                            $crate::entity::Field {
                                meta: $crate::entity::FieldMeta::new(
                                    stringify!([<$field:camel>]),
                                    <$field_ty as $crate::entity::FieldType>::KIND,
                                ),
                                get: |entity: &$name| {
                                    $crate::entity::FieldType::to_value(&entity.$field)
                                },
                                set: |entity: &mut $name, value: $crate::core::Value| {
                                    entity.$field = <$field_ty as $crate::entity::FieldType>::from_value(value)?;
                                    Ok(())
                                },
                            },
                        )*
                    ];
                }
                FIELDS
            }

            fn id(&self) -> $crate::entity::EntityId {
                self.id
            }

            fn with_id(id: $crate::entity::EntityId) -> Self {
                Self {
                    id,
                    $( $field: Default::default(), )*
                }
            }
        }
    };
}
