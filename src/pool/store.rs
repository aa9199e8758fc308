//! 存活列表与候选列表
//!
//! 两个列表都用"与末尾交换后收缩"的方式删除元素，O(1) 且不保序

use url::Url;

/// 存活列表的初始容量
pub const INITIAL_ALIVE_CAPACITY: usize = 32;

/// 存活代理列表
///
/// `slots` 是按下标访问的数组，`count` 是逻辑长度；下标小于 `count` 的槽位一定有值，
/// 其余槽位为空且永远不会被读取
#[derive(Debug, Clone)]
pub struct AliveStore {
    slots: Vec<Option<Url>>,
    count: usize,
}

impl AliveStore {
    /// 创建空列表，预分配 [`INITIAL_ALIVE_CAPACITY`] 个槽位
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_ALIVE_CAPACITY)
    }

    /// 按指定容量创建空列表
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            count: 0,
        }
    }

    /// 逻辑长度
    pub fn len(&self) -> usize {
        self.count
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 已分配的槽位数
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 追加一个代理，槽位不足时容量翻倍
    pub fn push(&mut self, endpoint: Url) {
        if self.count == self.slots.len() {
            let doubled = self.slots.len() * 2;
            self.slots.resize(doubled, None);
        }
        self.slots[self.count] = Some(endpoint);
        self.count += 1;
    }

    /// 读取下标处的代理，越过逻辑长度返回 `None`
    pub fn get(&self, index: usize) -> Option<&Url> {
        if index >= self.count {
            return None;
        }
        self.slots[index].as_ref()
    }

    /// 删除下标处的代理：与最后一个元素交换后收缩
    pub fn swap_remove(&mut self, index: usize) -> Option<Url> {
        if index >= self.count {
            return None;
        }
        let last = self.count - 1;
        self.slots.swap(index, last);
        self.count = last;
        self.slots[last].take()
    }

    /// 遍历当前所有存活代理
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.slots[..self.count].iter().flatten()
    }

    /// 复制一份当前内容
    pub fn snapshot(&self) -> Vec<Url> {
        self.iter().cloned().collect()
    }
}

impl Default for AliveStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 候选代理：最近探测失败，等待恢复或淘汰
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 代理地址
    pub endpoint: Url,
    /// 降级之后作为候选的连续失败次数，不包括导致降级的那一次
    ///
    /// 实际的连续失败次数是该值加1，所以淘汰时该值等于上限而不会超过上限
    pub consecutive_failures: u32,
}

impl Candidate {
    /// 刚从存活列表降级的候选，计数从0开始
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            consecutive_failures: 0,
        }
    }

    /// 记录一次失败，返回是否应当淘汰
    ///
    /// 计数达到 `max_failures` 时，算上降级那一次，连续失败已超过 `max_failures`
    pub fn record_failure(&mut self, max_failures: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures >= max_failures
    }
}

/// 候选代理列表，无序
#[derive(Debug, Clone, Default)]
pub struct CandidateStore {
    items: Vec<Candidate>,
}

impl CandidateStore {
    /// 创建空列表
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// 候选数量
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 追加候选
    pub fn push(&mut self, candidate: Candidate) {
        self.items.push(candidate);
    }

    /// 读取候选
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.items.get(index)
    }

    /// 可变读取候选
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Candidate> {
        self.items.get_mut(index)
    }

    /// 删除下标处的候选：与最后一个元素交换后收缩
    pub fn swap_remove(&mut self, index: usize) -> Option<Candidate> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.swap_remove(index))
    }

    /// 遍历候选
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    /// 所有候选的地址
    pub fn endpoints(&self) -> Vec<Url> {
        self.items.iter().map(|c| c.endpoint.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(port: u16) -> Url {
        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    #[test]
    fn test_alive_store_starts_empty() {
        let store = AliveStore::new();
        assert!(store.is_empty());
        assert_eq!(store.capacity(), INITIAL_ALIVE_CAPACITY);
        assert!(store.get(0).is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_alive_store_doubles_capacity() {
        let mut store = AliveStore::with_capacity(2);
        for port in 9001..9006 {
            store.push(endpoint(port));
        }
        assert_eq!(store.len(), 5);
        assert_eq!(store.capacity(), 8);
        assert_eq!(store.get(4), Some(&endpoint(9005)));
        assert!(store.get(5).is_none());
    }

    #[test]
    fn test_alive_store_swap_remove_moves_last() {
        let mut store = AliveStore::new();
        store.push(endpoint(9001));
        store.push(endpoint(9002));
        store.push(endpoint(9003));

        let removed = store.swap_remove(0);
        assert_eq!(removed, Some(endpoint(9001)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), Some(&endpoint(9003)));
        assert_eq!(store.get(1), Some(&endpoint(9002)));
        // 逻辑长度之外的槽位不可读
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_alive_store_swap_remove_last_and_out_of_range() {
        let mut store = AliveStore::new();
        store.push(endpoint(9001));
        assert!(store.swap_remove(1).is_none());
        assert_eq!(store.swap_remove(0), Some(endpoint(9001)));
        assert!(store.is_empty());
        assert!(store.swap_remove(0).is_none());
    }

    #[test]
    fn test_alive_store_descending_removal_keeps_survivors() {
        let mut store = AliveStore::new();
        for port in 9001..9006 {
            store.push(endpoint(port));
        }
        // 从大到小删除，剩余下标不受影响
        for index in [3, 1, 0] {
            store.swap_remove(index);
        }
        let mut left: Vec<_> = store.snapshot().into_iter().map(|u| u.port()).collect();
        left.sort();
        assert_eq!(left, vec![Some(9003), Some(9005)]);
    }

    #[test]
    fn test_candidate_record_failure() {
        let mut candidate = Candidate::new(endpoint(9001));
        assert_eq!(candidate.consecutive_failures, 0);
        assert!(!candidate.record_failure(2));
        assert_eq!(candidate.consecutive_failures, 1);
        assert!(candidate.record_failure(2));
    }

    #[test]
    fn test_candidate_evicted_once_failures_exceed_max() {
        let max_failures = 2;
        let mut candidate = Candidate::new(endpoint(9001));

        // 降级算第1次失败，候选期间第1次失败后共2次，未超过上限
        assert!(!candidate.record_failure(max_failures));
        assert_eq!(candidate.consecutive_failures + 1, 2);

        // 共3次连续失败，超过上限被淘汰；计数停在上限
        assert!(candidate.record_failure(max_failures));
        assert_eq!(candidate.consecutive_failures, max_failures);
        assert!(candidate.consecutive_failures + 1 > max_failures);
    }

    #[test]
    fn test_candidate_store_swap_remove() {
        let mut store = CandidateStore::new();
        store.push(Candidate::new(endpoint(9001)));
        store.push(Candidate::new(endpoint(9002)));
        store.push(Candidate::new(endpoint(9003)));

        let removed = store.swap_remove(0).unwrap();
        assert_eq!(removed.endpoint, endpoint(9001));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().endpoint, endpoint(9003));
        assert!(store.swap_remove(5).is_none());
    }
}
