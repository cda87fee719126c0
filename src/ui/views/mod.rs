mod team_gate;
mod team_list;

pub use team_gate::TeamGateView;
pub use team_list::TeamListView;
