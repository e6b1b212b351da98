//! Thread-safety bounds that disappear without the `parallel` feature.
//!
//! Skeleton operators and elements cross thread boundaries only when the
//! `parallel` feature is on. With it, [`MaybeSend`] is [`Send`],
//! [`MaybeSync`] is [`Sync`] and [`MaybeSendSync`] is both. Without it, all
//! three are implemented for every type, so `Rc`-capturing closures and
//! non-`Send` elements can still drive the sequential skeletons.

#[cfg(feature = "parallel")]
mod bounds {
    pub trait MaybeSend: Send {}
    impl<T: Send + ?Sized> MaybeSend for T {}

    pub trait MaybeSync: Sync {}
    impl<T: Sync + ?Sized> MaybeSync for T {}

    pub trait MaybeSendSync: Send + Sync {}
    impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}
}

#[cfg(not(feature = "parallel"))]
mod bounds {
    pub trait MaybeSend {}
    impl<T: ?Sized> MaybeSend for T {}

    pub trait MaybeSync {}
    impl<T: ?Sized> MaybeSync for T {}

    pub trait MaybeSendSync {}
    impl<T: ?Sized> MaybeSendSync for T {}
}

pub use bounds::{MaybeSend, MaybeSendSync, MaybeSync};

#[cfg(test)]
mod tests {
    use super::*;

    fn require_operator<F: Fn(&u64, &u64) -> u64 + MaybeSync>(_: &F) {}
    fn require_element<T: MaybeSendSync>() {}

    #[test]
    fn test_plain_closures_and_elements_qualify() {
        let add = |a: &u64, b: &u64| a + b;
        require_operator(&add);
        require_element::<u64>();
        require_element::<String>();
        require_element::<(i32, [u8; 16])>();
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_rc_qualifies_without_parallel() {
        use std::rc::Rc;
        let offset = Rc::new(3u64);
        let add = move |a: &u64, b: &u64| a + b + *offset;
        require_operator(&add);
        require_element::<Rc<u64>>();
    }
}
