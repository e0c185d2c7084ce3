use std::ops::RangeFrom;

pub fn map_join<I: IntoIterator, T: ToString, F: FnMut(I::Item) -> T>(it: I, closure: F) -> String {
    it.into_iter().map(closure).map(|t| t.to_string()).collect::<Vec<String>>().join(", ")
}

pub fn join_with<I: IntoIterator>(it: I, sep: &str) -> String where I::Item: ToString {
    it.into_iter().map(|t| t.to_string()).collect::<Vec<String>>().join(sep)
}

pub fn pluralize(word: &str, count: u64) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct Counter {
    count: u32
}

impl Counter {
    pub fn new(start: u32) -> Counter {
        Counter { count: start }
    }

    pub fn next(&mut self) -> u32 {
        let value = self.count;
        self.count += 1;
        value
    }

    pub fn peek(&self) -> u32 {
        self.count
    }
}

impl From<RangeFrom<u32>> for Counter {
    fn from(value: RangeFrom<u32>) -> Self {
        Counter { count: value.start }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counter_is_sequential() {
        let mut counter = Counter::from(3..);
        assert_eq!(counter.next(), 3);
        assert_eq!(counter.next(), 4);
        assert_eq!(counter.peek(), 5);
    }

    #[test]
    fn joins() {
        assert_eq!(map_join([1, 2, 3], |i| i * 2), "2, 4, 6");
        assert_eq!(join_with(["a", "b"], "."), "a.b");
        assert_eq!(pluralize("argument", 1), "1 argument");
        assert_eq!(pluralize("argument", 2), "2 arguments");
    }
}
