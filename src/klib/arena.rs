//! # Arena de slots estáveis
//!
//! Tabela de capacidade fixa com free-list. "Alocar" é retirar um slot da
//! free-list, "liberar" é devolvê-lo. O índice do slot é a identidade estável
//! do objeto; a geração impede que um id antigo case com o próximo ocupante.

/// Id geracional de um slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Empacota em 64 bits (geração alta, índice baixo).
    pub const fn as_u64(&self) -> u64 {
        (self.generation as u64) << 32 | self.index as u64
    }

    pub const fn from_u64(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena de capacidade fixa.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    /// Cria arena com `capacity` slots, todos livres.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Slot {
                generation: 0,
                value: None,
            });
        }
        // Free-list em ordem crescente: pop() devolve o menor índice primeiro.
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots ainda disponíveis.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Insere um valor. `None` se a arena estiver cheia.
    pub fn insert(&mut self, value: T) -> Option<SlotId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = Some(value);
        self.live += 1;
        Some(SlotId {
            index,
            generation: slot.generation,
        })
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Remove e devolve o valor; o slot volta para a free-list.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(id.index);
        self.live -= 1;
        Some(value)
    }

    /// Itera sobre os slots ocupados.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    SlotId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_id_never_aliases_new_occupant() {
        let mut arena = Arena::with_capacity(1);
        let a = arena.insert("a").unwrap();
        assert_eq!(arena.remove(a), Some("a"));

        let b = arena.insert("b").unwrap();
        assert_eq!(a.index(), b.index());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn capacity_is_hard_limit() {
        let mut arena = Arena::with_capacity(2);
        let a = arena.insert(1).unwrap();
        arena.insert(2).unwrap();
        assert!(arena.insert(3).is_none());
        assert_eq!(arena.available(), 0);

        arena.remove(a);
        assert_eq!(arena.available(), 1);
        assert!(arena.insert(3).is_some());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn packed_id_survives_u64_conversion() {
        let mut arena = Arena::with_capacity(4);
        arena.insert(()).unwrap();
        let id = arena.insert(()).unwrap();
        assert_eq!(SlotId::from_u64(id.as_u64()), id);
    }
}
