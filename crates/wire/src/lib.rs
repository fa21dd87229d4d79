// SPDX-License-Identifier: MIT

//! Wire format shared by the `suq` client and the `suqd` daemon: the raw
//! request frame (working directory + argv + envp, exactly as the client
//! process saw them), the parsed command it decodes into, and the reply
//! text conventions the client relies on to pick an exit code.

mod command;
mod frame;
mod reply;

pub use command::{Command, CommandError, JobTarget};
pub use frame::{FrameError, RequestFrame, FRAME_TERMINATOR};
pub use reply::{
    del_killed_reply, del_removed_reply, echo_reply, error_reply, info_reply, is_error_reply,
    job_not_found_reply, list_reply, ntask_reply, pri_changed_reply, pri_unchanged_reply,
    submit_reply, wait_already_satisfied_reply, wait_finished_all_reply,
    wait_finished_by_id_reply, wait_finished_submitted_before_reply, wait_registered_reply,
    USAGE,
};
