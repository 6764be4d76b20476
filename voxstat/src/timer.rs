use std::time::{Duration, Instant};

/// 分阶段累计计时器。
#[derive(Clone, Debug)]
pub struct AccTimer {
    stage: &'static str,
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化名为`stage`的计时器，并从此刻开始计时。
    #[inline]
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 将上一次计时点到现在的时间累计起来，并以现在作为新的计时点。
    #[inline]
    pub fn elapsed(&mut self) {
        let now = Instant::now();
        self.consumed += now - self.since;
        self.since = now;
    }

    /// 获得总共累计下来的时间（以毫秒为单位）。
    #[inline]
    pub fn get_total_ms(&self) -> u64 {
        self.consumed.as_millis() as u64
    }

    /// 结束本区间计时，并把该阶段的累计耗时写入日志。
    pub fn finish(&mut self) {
        self.elapsed();
        log::info!("阶段`{}`耗时 {} ms", self.stage, self.get_total_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::AccTimer;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timer_accumulates_intervals() {
        let mut timer = AccTimer::new("test");
        thread::sleep(Duration::from_millis(5));
        timer.elapsed();
        let first = timer.get_total_ms();
        assert!(first >= 5);

        thread::sleep(Duration::from_millis(5));
        timer.finish();
        assert!(timer.get_total_ms() >= first + 5);
    }
}
