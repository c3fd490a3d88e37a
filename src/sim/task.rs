//! Cooperative task scheduler
//!
//! Game logic is written as tasks that the world advances once per frame.
//! Long-running behavior is expressed with coroutine tasks: a script is a
//! step function that runs until it hits a suspension point and reports it
//! as a [`Flow`] (yield a frame, wait N frames, await a sub-task, or finish).
//! Everything a task does within one frame happens synchronously inside its
//! own `tick`; no other task runs in between.
//!
//! Killing a task never resumes its script again. Scripts that need teardown
//! must do it as an explicit step before finishing.

use std::fmt;

use glam::Vec2;

use super::boss::Boss;
use super::bullet::Bullet;
use super::entity::{Category, EntityId, EntityRef};
use super::world::World;

/// Errors from misusing a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Appending to a sequence that already finished
    SequenceCompleted,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceCompleted => write!(f, "cannot add task to a completed sequence"),
        }
    }
}

impl std::error::Error for TaskError {}

/// What a task sees while it runs: the world and the entity it belongs to
pub struct TaskCtx<'w> {
    pub world: &'w mut World,
    pub owner: Option<EntityRef>,
}

impl<'w> TaskCtx<'w> {
    pub fn new(world: &'w mut World, owner: Option<EntityRef>) -> Self {
        Self { world, owner }
    }

    /// Reborrow with a different owner
    pub fn scoped(&mut self, owner: Option<EntityRef>) -> TaskCtx<'_> {
        TaskCtx {
            world: &mut *self.world,
            owner,
        }
    }

    pub fn owner_id(&self) -> Option<EntityId> {
        self.owner.map(|o| o.id)
    }

    /// Position of the owner, if it is still alive
    pub fn owner_pos(&self) -> Option<Vec2> {
        self.owner.and_then(|o| self.world.entity_pos(o))
    }

    /// Whether the owner is still alive (true for unowned tasks)
    pub fn owner_alive(&self) -> bool {
        self.owner.is_none_or(|o| self.world.is_alive(o))
    }

    /// The owner, if it is a live bullet
    pub fn owner_bullet_mut(&mut self) -> Option<&mut Bullet> {
        let owner = self.owner.filter(|o| o.category == Category::Bullet)?;
        self.world.bullets.get_live_mut(owner.id)
    }

    /// The owner, if it is a live boss
    pub fn owner_boss_mut(&mut self) -> Option<&mut Boss> {
        let owner = self.owner.filter(|o| o.category == Category::Boss)?;
        self.world.bosses.get_live_mut(owner.id)
    }
}

/// Suspension reported by a script step
pub enum Flow {
    /// Resume next frame
    Yield,
    /// Resume after this many frames; `<= 0` continues immediately
    Wait(i32),
    /// Tick this task every frame and resume once it is dead
    Await(Task),
    /// Script finished
    Done,
}

/// A coroutine script step
pub type Script = Box<dyn FnMut(&mut TaskCtx<'_>) -> Flow>;

/// A unit of schedulable work
pub enum Task {
    /// Already complete
    Empty,
    Runnable(RunnableTask),
    Wait(WaitTask),
    Sequence(SequenceTask),
    Parallel(ParallelTask),
    Coroutine(CoroutineTask),
}

impl Task {
    pub fn empty() -> Self {
        Task::Empty
    }

    /// Runs `action` on its first tick, then completes
    pub fn run(action: impl FnOnce(&mut TaskCtx<'_>) + 'static) -> Self {
        Task::Runnable(RunnableTask {
            action: Some(Box::new(action)),
        })
    }

    /// Completes after `frames` ticks
    pub fn wait(frames: i32) -> Self {
        Task::Wait(WaitTask {
            remaining: frames,
            alive: true,
        })
    }

    pub fn sequence(tasks: impl IntoIterator<Item = Task>) -> Self {
        Task::Sequence(SequenceTask::new(tasks))
    }

    /// Alive while any child is alive
    pub fn join_all(tasks: impl IntoIterator<Item = Task>) -> Self {
        Task::Parallel(ParallelTask::new(tasks, Join::All))
    }

    /// Completes as soon as any child completes, killing the rest
    pub fn race(tasks: impl IntoIterator<Item = Task>) -> Self {
        Task::Parallel(ParallelTask::new(tasks, Join::Any))
    }

    /// Coroutine driven by a script step function
    pub fn coroutine(script: impl FnMut(&mut TaskCtx<'_>) -> Flow + 'static) -> Self {
        Task::Coroutine(CoroutineTask::new(script))
    }

    pub fn alive(&self) -> bool {
        match self {
            Task::Empty => false,
            Task::Runnable(t) => t.action.is_some(),
            Task::Wait(t) => t.alive,
            Task::Sequence(t) => t.alive,
            Task::Parallel(t) => t.alive,
            Task::Coroutine(t) => t.alive,
        }
    }

    /// Execution order among tasks attached to the same entity
    pub fn index(&self) -> i32 {
        match self {
            Task::Coroutine(t) => t.index,
            _ => 0,
        }
    }

    /// Advance one frame; no-op once dead
    pub fn tick(&mut self, ctx: &mut TaskCtx<'_>) {
        match self {
            Task::Empty => {}
            Task::Runnable(t) => {
                if let Some(action) = t.action.take() {
                    action(ctx);
                }
            }
            Task::Wait(t) => t.tick(),
            Task::Sequence(t) => t.tick(ctx),
            Task::Parallel(t) => t.tick(ctx),
            Task::Coroutine(t) => t.tick(ctx),
        }
    }

    /// Force-terminate; returns whether the task was newly killed
    pub fn kill(&mut self) -> bool {
        match self {
            Task::Empty => false,
            Task::Runnable(t) => t.action.take().is_some(),
            Task::Wait(t) => std::mem::replace(&mut t.alive, false),
            Task::Sequence(t) => t.kill(),
            Task::Parallel(t) => t.kill(),
            Task::Coroutine(t) => t.kill(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Empty => "Empty",
            Task::Runnable(_) => "Runnable",
            Task::Wait(_) => "Wait",
            Task::Sequence(_) => "Sequence",
            Task::Parallel(_) => "Parallel",
            Task::Coroutine(_) => "Coroutine",
        };
        f.debug_struct(name).field("alive", &self.alive()).finish()
    }
}

impl From<CoroutineTask> for Task {
    fn from(t: CoroutineTask) -> Self {
        Task::Coroutine(t)
    }
}

impl From<SequenceTask> for Task {
    fn from(t: SequenceTask) -> Self {
        Task::Sequence(t)
    }
}

/// One-shot action
pub struct RunnableTask {
    action: Option<Box<dyn FnOnce(&mut TaskCtx<'_>)>>,
}

/// Frame countdown
pub struct WaitTask {
    remaining: i32,
    alive: bool,
}

impl WaitTask {
    fn tick(&mut self) {
        if !self.alive {
            return;
        }
        self.remaining -= 1;
        if self.remaining <= 0 {
            self.alive = false;
        }
    }
}

/// Runs children one after another, one child per frame
pub struct SequenceTask {
    tasks: Vec<Task>,
    current: usize,
    alive: bool,
}

impl SequenceTask {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
            current: 0,
            alive: true,
        }
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    /// Append a task
    ///
    /// # Panics
    ///
    /// Panics if the sequence already completed.
    pub fn push(&mut self, task: Task) {
        if let Err(e) = self.try_push(task) {
            panic!("{e}");
        }
    }

    pub fn try_push(&mut self, task: Task) -> Result<(), TaskError> {
        if !self.alive {
            return Err(TaskError::SequenceCompleted);
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Concatenate two sequences into a fresh one
    pub fn chain(mut self, mut other: SequenceTask) -> SequenceTask {
        let mut tasks: Vec<Task> = self.tasks.drain(self.current..).collect();
        tasks.extend(other.tasks.drain(other.current..));
        SequenceTask::new(tasks)
    }

    fn tick(&mut self, ctx: &mut TaskCtx<'_>) {
        if !self.alive {
            return;
        }
        while self.current < self.tasks.len() && !self.tasks[self.current].alive() {
            self.current += 1;
        }
        let Some(task) = self.tasks.get_mut(self.current) else {
            self.tasks.clear();
            self.alive = false;
            return;
        };
        task.tick(ctx);
    }

    fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        for task in &mut self.tasks {
            task.kill();
        }
        self.tasks.clear();
        self.alive = false;
        true
    }
}

/// How a parallel task decides it is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Alive while any child is alive
    All,
    /// Finished once any child finishes
    Any,
}

/// Ticks all children every frame
pub struct ParallelTask {
    tasks: Vec<Task>,
    join: Join,
    alive: bool,
}

impl ParallelTask {
    pub fn new(tasks: impl IntoIterator<Item = Task>, join: Join) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
            join,
            alive: true,
        }
    }

    fn tick(&mut self, ctx: &mut TaskCtx<'_>) {
        if !self.alive {
            return;
        }
        for task in &mut self.tasks {
            if task.alive() {
                task.tick(ctx);
            }
        }
        let finished = match self.join {
            Join::All => self.tasks.iter().all(|t| !t.alive()),
            Join::Any => self.tasks.is_empty() || self.tasks.iter().any(|t| !t.alive()),
        };
        if finished {
            self.kill();
        }
    }

    fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        for task in &mut self.tasks {
            task.kill();
        }
        self.tasks.clear();
        self.alive = false;
        true
    }
}

enum Resume {
    Ready,
    Frames(u32),
    Awaiting(Box<Task>),
}

/// Task backed by a suspendable script
pub struct CoroutineTask {
    index: i32,
    owner: Option<EntityRef>,
    script: Script,
    resume: Resume,
    alive: bool,
}

impl CoroutineTask {
    pub fn new(script: impl FnMut(&mut TaskCtx<'_>) -> Flow + 'static) -> Self {
        Self {
            index: 0,
            owner: None,
            script: Box::new(script),
            resume: Resume::Ready,
            alive: true,
        }
    }

    /// Order among tasks attached to the same entity
    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    /// Bind to an entity: the script sees it as its owner and dies with it
    pub fn with_owner(mut self, owner: EntityRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn owner(&self) -> Option<EntityRef> {
        self.owner
    }

    fn owner_gone(&self, world: &World) -> bool {
        self.owner.is_some_and(|o| !world.is_alive(o))
    }

    fn tick(&mut self, ctx: &mut TaskCtx<'_>) {
        if !self.alive {
            return;
        }
        if self.owner_gone(ctx.world) {
            self.kill();
            return;
        }
        let mut ctx = ctx.scoped(self.owner.or(ctx.owner));

        match &mut self.resume {
            Resume::Ready => {}
            Resume::Frames(n) => {
                *n -= 1;
                if *n > 0 {
                    return;
                }
            }
            Resume::Awaiting(task) => {
                task.tick(&mut ctx);
                if task.alive() {
                    return;
                }
            }
        }
        self.resume = Resume::Ready;

        // Run to the next suspension point
        loop {
            match (self.script)(&mut ctx) {
                Flow::Yield => {
                    self.resume = Resume::Frames(1);
                    return;
                }
                Flow::Wait(n) if n > 0 => {
                    self.resume = Resume::Frames(n as u32);
                    return;
                }
                Flow::Wait(_) => {}
                Flow::Await(task) => {
                    if task.alive() {
                        self.resume = Resume::Awaiting(Box::new(task));
                        return;
                    }
                }
                Flow::Done => {
                    self.alive = false;
                    return;
                }
            }
            if self.owner_gone(ctx.world) {
                self.kill();
                return;
            }
        }
    }

    fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        if let Resume::Awaiting(task) = &mut self.resume {
            task.kill();
        }
        self.resume = Resume::Ready;
        true
    }
}

struct AttachedTask {
    index: i32,
    seq: u64,
    task: Task,
}

/// Tasks attached to one entity, kept in (index, attach order) order
#[derive(Default)]
pub struct TaskList {
    entries: Vec<AttachedTask>,
    next_seq: u64,
}

impl fmt::Debug for TaskList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskList")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach using the task's own index
    pub fn attach(&mut self, task: Task) {
        let index = task.index();
        self.attach_indexed(index, task);
    }

    pub fn attach_indexed(&mut self, index: i32, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = self.entries.partition_point(|e| e.index <= index);
        self.entries.insert(at, AttachedTask { index, seq, task });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any attached task is still alive
    pub fn any_alive(&self) -> bool {
        self.entries.iter().any(|e| e.task.alive())
    }

    /// Tick every live task in order, then drop the dead ones
    pub fn tick(&mut self, ctx: &mut TaskCtx<'_>) {
        for entry in &mut self.entries {
            if entry.task.alive() {
                entry.task.tick(ctx);
            }
        }
        self.entries.retain(|e| e.task.alive());
    }

    /// Kill everything; returns how many tasks were newly killed
    pub fn kill_all(&mut self) -> usize {
        let mut killed = 0;
        for entry in &mut self.entries {
            if entry.task.kill() {
                killed += 1;
            }
        }
        self.entries.clear();
        killed
    }

    /// Move the tasks out so they can run while the owner is borrowed.
    /// Tasks attached in the meantime keep their attach order.
    pub fn detach(&mut self) -> TaskList {
        TaskList {
            entries: std::mem::take(&mut self.entries),
            next_seq: self.next_seq,
        }
    }

    /// Merge tasks taken by [`TaskList::detach`] back in
    pub fn restore(&mut self, mut detached: TaskList) {
        detached.entries.append(&mut self.entries);
        detached.entries.sort_by_key(|e| (e.index, e.seq));
        self.entries = detached.entries;
    }
}
