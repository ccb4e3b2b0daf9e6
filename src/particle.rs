//! Particle system

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::{Error, Result};

pub trait Property: 'static {
    type Subtype: Clone + Send + Sync + 'static;

    /// Name used for diagnostics.
    const NAME: &'static str;

    fn new() -> Self::Subtype;
}

pub type ReadGuard<'a, T> = MappedRwLockReadGuard<'a, [<T as Property>::Subtype]>;
pub type WriteGuard<'a, T> = MappedRwLockWriteGuard<'a, [<T as Property>::Subtype]>;

/// Per-particle property store.
///
/// Every property lives behind its own lock, so a kernel may write one field
/// while reading others. Requests which would alias fail with
/// [`Error::BorrowConflict`] instead of blocking.
pub struct Particles {
    num_particles: usize,
    properties: HashMap<TypeId, RwLock<Box<dyn Storage>>>,
}

impl Particles {
    pub fn new() -> Self {
        Particles {
            num_particles: 0,
            properties: HashMap::new(),
        }
    }

    pub fn add_property<T: Property>(&mut self) {
        let num_particles = self.num_particles;
        self.properties.entry(TypeId::of::<T>()).or_insert_with(|| {
            RwLock::new(Box::new(VecStorage::<T> {
                values: vec![T::new(); num_particles],
                marker: PhantomData,
            }))
        });
    }

    pub fn has_property<T: Property>(&self) -> bool {
        self.properties.contains_key(&TypeId::of::<T>())
    }

    pub fn read_property<T: Property>(&self) -> Result<ReadGuard<T>> {
        let lock = self.lock::<T>()?;
        let guard = lock.try_read().ok_or(Error::BorrowConflict { property: T::NAME })?;
        RwLockReadGuard::try_map(guard, |storage| {
            storage.as_any().downcast_ref::<VecStorage<T>>().map(|s| s.values.as_slice())
        })
        .map_err(|_| Error::MissingProperty { property: T::NAME })
    }

    pub fn write_property<T: Property>(&self) -> Result<WriteGuard<T>> {
        let lock = self.lock::<T>()?;
        let guard = lock.try_write().ok_or(Error::BorrowConflict { property: T::NAME })?;
        RwLockWriteGuard::try_map(guard, |storage| {
            storage.as_any_mut().downcast_mut::<VecStorage<T>>().map(|s| s.values.as_mut_slice())
        })
        .map_err(|_| Error::MissingProperty { property: T::NAME })
    }

    fn lock<T: Property>(&self) -> Result<&RwLock<Box<dyn Storage>>> {
        self.properties
            .get(&TypeId::of::<T>())
            .ok_or(Error::MissingProperty { property: T::NAME })
    }

    pub fn reserve(&mut self, additional: usize) {
        for property in self.properties.values_mut() {
            property.get_mut().reserve(additional);
        }
    }

    pub fn add_particles(&mut self, additional: usize) -> Builder {
        self.reserve(additional);
        self.num_particles += additional;
        Builder(self)
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles
    }
}

impl Default for Particles {
    fn default() -> Self {
        Particles::new()
    }
}

pub struct Builder<'a>(&'a mut Particles);

impl<'a> Builder<'a> {
    /// Append initial values for a property.
    ///
    /// Unknown properties are ignored; the slice must cover exactly the
    /// newly added particles. On a length mismatch nothing is appended and
    /// the property is filled with defaults.
    pub fn with<T: Property>(&mut self, values: &[T::Subtype]) -> Result<&mut Self> {
        let num_particles = self.0.num_particles;
        if let Some(property) = self.0.properties.get_mut(&TypeId::of::<T>()) {
            if let Some(storage) = property.get_mut().as_any_mut().downcast_mut::<VecStorage<T>>() {
                let expected = num_particles - storage.values.len();
                if values.len() != expected {
                    return Err(Error::LengthMismatch {
                        property: T::NAME,
                        expected,
                        found: values.len(),
                    });
                }
                storage.values.extend_from_slice(values);
            }
        }

        Ok(self)
    }
}

impl<'a> Drop for Builder<'a> {
    fn drop(&mut self) {
        // fill remaining properties with default values
        let num_particles = self.0.num_particles;
        for property in self.0.properties.values_mut() {
            let storage = property.get_mut();
            let remaining = num_particles.saturating_sub(storage.len());
            if remaining > 0 {
                storage.fill(remaining);
            }
        }
    }
}

pub trait Storage: Any + Send + Sync {
    fn len(&self) -> usize;
    fn reserve(&mut self, additional: usize);
    fn fill(&mut self, additional: usize);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct VecStorage<T: Property> {
    values: Vec<T::Subtype>,
    marker: PhantomData<fn() -> T>,
}

impl<T: Property> Storage for VecStorage<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    fn fill(&mut self, additional: usize) {
        let len = self.values.len();
        self.values.resize(len + additional, T::new());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Weight;
    impl Property for Weight {
        type Subtype = f64;
        const NAME: &'static str = "Weight";
        fn new() -> f64 {
            1.0
        }
    }

    struct Tag;
    impl Property for Tag {
        type Subtype = i32;
        const NAME: &'static str = "Tag";
        fn new() -> i32 {
            0
        }
    }

    #[test]
    fn builder_fills_defaults() {
        let mut particles = Particles::new();
        particles.add_property::<Weight>();
        particles.add_property::<Tag>();
        particles.add_particles(3).with::<Tag>(&[4, 5, 6]).unwrap();

        assert_eq!(particles.num_particles(), 3);
        assert_eq!(&*particles.read_property::<Weight>().unwrap(), &[1.0, 1.0, 1.0]);
        assert_eq!(&*particles.read_property::<Tag>().unwrap(), &[4, 5, 6]);
    }

    #[test]
    fn property_added_later_matches_count() {
        let mut particles = Particles::new();
        particles.add_property::<Tag>();
        particles.add_particles(2);
        particles.add_property::<Weight>();
        assert_eq!(particles.read_property::<Weight>().unwrap().len(), 2);
    }

    #[test]
    fn disjoint_properties_can_be_borrowed_together() {
        let mut particles = Particles::new();
        particles.add_property::<Weight>();
        particles.add_property::<Tag>();
        particles.add_particles(2);

        let weights = particles.read_property::<Weight>().unwrap();
        let mut tags = particles.write_property::<Tag>().unwrap();
        tags[1] = weights[1] as i32 + 1;
        assert_eq!(tags[1], 2);
    }

    #[test]
    fn aliasing_write_is_rejected() {
        let mut particles = Particles::new();
        particles.add_property::<Tag>();
        particles.add_particles(1);

        let _tags = particles.read_property::<Tag>().unwrap();
        match particles.write_property::<Tag>() {
            Err(Error::BorrowConflict { property }) => assert_eq!(property, "Tag"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("aliasing write granted"),
        };
    }

    #[test]
    fn missing_property_is_reported() {
        let particles = Particles::new();
        match particles.read_property::<Weight>() {
            Err(Error::MissingProperty { property }) => assert_eq!(property, "Weight"),
            _ => panic!("expected missing property"),
        };
    }

    #[test]
    fn builder_rejects_wrong_length() {
        let mut particles = Particles::new();
        particles.add_property::<Weight>();
        particles.add_property::<Tag>();

        {
            let mut builder = particles.add_particles(2);
            match builder.with::<Tag>(&[1, 2, 3]) {
                Err(Error::LengthMismatch { property, expected, found }) => {
                    assert_eq!((property, expected, found), ("Tag", 2, 3))
                }
                _ => panic!("expected length mismatch"),
            };
            assert!(builder.with::<Weight>(&[0.5]).is_err());
        }

        // rejected values are replaced by defaults
        assert_eq!(&*particles.read_property::<Tag>().unwrap(), &[0, 0]);
        assert_eq!(&*particles.read_property::<Weight>().unwrap(), &[1.0, 1.0]);
    }
}
