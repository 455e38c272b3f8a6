//! Macros for declaring action types.

/// Generate a fieldless action-type enum and its `ActionKind` implementation.
///
/// The wire name of each variant is its identifier: `ActionKind::name`,
/// `from_name` and the serde representation all agree. Variants therefore
/// accept doc comments only, so a `#[serde(rename = ..)]` cannot make the
/// serialized name drift from `name()`:
///
/// ```compile_fail
/// use foresight::action_kind;
///
/// action_kind! {
///     pub enum IssueAction {
///         #[serde(rename = "add_label")]
///         AddLabel,
///     }
/// }
/// ```
///
/// # Example
///
/// ```
/// use foresight::action::ActionKind;
/// use foresight::action_kind;
///
/// action_kind! {
///     pub enum IssueAction {
///         AddLabel,
///         RemoveLabel,
///         Close,
///     }
/// }
///
/// assert_eq!(IssueAction::Close.name(), "Close");
/// assert_eq!(IssueAction::all().len(), 3);
/// ```
#[macro_export]
macro_rules! action_kind {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[doc = $variant_doc:literal])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[doc = $variant_doc])*
                $variant
            ),*
        }

        impl $crate::action::ActionKind for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn all() -> &'static [Self] {
                &[$(Self::$variant),*]
            }
        }
    };
}
