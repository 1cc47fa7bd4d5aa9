use std::mem::ManuallyDrop;

use crate::buffer::Buffer;
use crate::texture::Texture;
use crate::Device;

/// A resource that has to be handed back to the object that created it.
pub trait Destroy {
    type Context;
    fn destroy(self, context: &Self::Context);
}

impl Destroy for Buffer {
    type Context = Device;

    fn destroy(self, device: &Device) {
        Buffer::destroy(self, device)
    }
}

impl Destroy for Texture {
    type Context = Device;

    fn destroy(self, device: &Device) {
        Texture::destroy(self, device)
    }
}

/// Destroys the held resource when dropped, unless it was taken out first.
/// Used while building objects out of several resources so that an early
/// return releases whatever was created so far.
pub struct Guard<'a, D: Destroy> {
    item: ManuallyDrop<D>,
    context: &'a D::Context,
}

impl<'a, D: Destroy> Guard<'a, D> {
    pub fn new(context: &'a D::Context, item: D) -> Self {
        Self {
            item: ManuallyDrop::new(item),
            context,
        }
    }

    pub fn take(mut self) -> D {
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        std::mem::forget(self);
        item
    }
}

impl<D: Destroy> Drop for Guard<'_, D> {
    fn drop(&mut self) {
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        item.destroy(self.context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Handle(u32);

    impl Destroy for Handle {
        type Context = RefCell<Vec<u32>>;

        fn destroy(self, destroyed: &RefCell<Vec<u32>>) {
            destroyed.borrow_mut().push(self.0);
        }
    }

    fn build(destroyed: &RefCell<Vec<u32>>, fail_at: u32) -> Result<(Handle, Handle), ()> {
        let first = Guard::new(destroyed, Handle(1));
        if fail_at == 2 {
            return Err(());
        }
        let second = Guard::new(destroyed, Handle(2));
        if fail_at == 3 {
            return Err(());
        }
        Ok((first.take(), second.take()))
    }

    #[test]
    fn early_return_destroys_what_was_created() {
        let destroyed = RefCell::new(Vec::new());

        assert!(build(&destroyed, 3).is_err());

        let mut ids = destroyed.borrow().clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn failure_before_later_resources_only_destroys_earlier_ones() {
        let destroyed = RefCell::new(Vec::new());

        assert!(build(&destroyed, 2).is_err());

        assert_eq!(*destroyed.borrow(), vec![1]);
    }

    #[test]
    fn taken_resources_are_left_alone() {
        let destroyed = RefCell::new(Vec::new());

        let (first, second) = build(&destroyed, 0).unwrap();

        assert_eq!((first.0, second.0), (1, 2));
        assert!(destroyed.borrow().is_empty());
    }
}
