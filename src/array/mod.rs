//! Growable contiguous sequence and its supporting machinery.

mod buf;
mod dynamic;
mod into_iter;

pub use dynamic::DynamicArray;
pub use into_iter::IntoIter;

/// [`DynamicArray`] construction in `vec!` notation.
///
/// `dynarray![]` is the null state, `dynarray![v; n]` is `n` clones of
/// `v`, `dynarray![a, b, c]` lists elements.
#[macro_export]
macro_rules! dynarray {
    () => {
        $crate::array::DynamicArray::new()
    };
    ($value:expr; $count:expr) => {{
        let mut array = $crate::array::DynamicArray::new();
        array.assign_fill($count, $value);
        array
    }};
    ($($item:expr),+ $(,)?) => {
        $crate::array::DynamicArray::from([$($item),+])
    };
}
