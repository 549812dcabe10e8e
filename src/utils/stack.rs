pub(crate) struct Stack<T> {
    buff: Vec<T>,
}

impl<T> Stack<T> {
    pub(crate) fn new() -> Self {
        Stack { buff: vec![] }
    }

    pub(crate) fn push(&mut self, e: T) {
        self.buff.push(e)
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.buff.pop()
    }

    pub(crate) fn get(&self, at: usize) -> Option<&T> {
        self.buff.get(at)
    }

    // Find the position of the element closest to the top that satisfies 'f'
    pub(crate) fn rposition<F>(&self, f: F) -> Option<usize>
    where
        F: Fn(&T) -> bool,
    {
        self.buff.iter().rposition(f)
    }

    // Drop everything above the first 'len' elements
    pub(crate) fn truncate(&mut self, len: usize) {
        self.buff.truncate(len)
    }

    pub(crate) fn len(&self) -> usize {
        self.buff.len()
    }
}
