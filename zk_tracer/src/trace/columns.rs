use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

/// Groups of columns: common columns are set on every row, the others only
/// on rows of their own perspective and zeroed elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum Perspective {
    Common,
    Stack,
    Account,
    Context,
    Storage,
    Transaction,
    Copy,
}

macro_rules! columns {
    ($($perspective:ident => [$($column:ident),* $(,)?]),* $(,)?) => {
        /// Every column of the hub trace.
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumCount, EnumIter, IntoStaticStr,
        )]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum Column {
            $($($column,)*)*
        }

        impl Column {
            pub const fn perspective(self) -> Perspective {
                match self {
                    $($(Column::$column => Perspective::$perspective,)*)*
                }
            }
        }
    };
}

columns! {
    Common => [
        AbsoluteTransactionNumber,
        BatchNumber,
        TxSkip,
        TxWarm,
        TxInit,
        TxExec,
        TxFinl,
        HubStamp,
        HubStampTransactionEnd,
        TransactionReverts,
        ExceptionAhoy,
        ContextNumber,
        ContextNumberNew,
        CallerContextNumber,
        ContextWillRevert,
        ContextGetsReverted,
        ContextSelfReverts,
        ContextRevertStamp,
        ProgramCounter,
        ProgramCounterNew,
        CodeAddress,
        CodeDeploymentNumber,
        CodeDeploymentStatus,
        TwoLineInstruction,
        CounterTli,
        NumberOfNonStackRows,
        CounterNsr,
        PeekAtStack,
        PeekAtAccount,
        PeekAtContext,
        PeekAtStorage,
        PeekAtTransaction,
        PeekAtCopy,
    ],
    Stack => [
        StackInstruction,
        StackFamily,
        StackHeight,
        StackHeightNew,
        StackUnderflow,
        StackOverflow,
        StackDelta,
        StackAlpha,
        StackFlag1,
        StackFlag2,
        StackFlag3,
        StackFlag4,
        StackItemHeight1,
        StackItemHeight2,
        StackItemHeight3,
        StackItemHeight4,
        StackItemValue1,
        StackItemValue2,
        StackItemValue3,
        StackItemValue4,
        StackItemPop1,
        StackItemPop2,
        StackItemPop3,
        StackItemPop4,
        StackItemStamp1,
        StackItemStamp2,
        StackItemStamp3,
        StackItemStamp4,
    ],
    Account => [
        AccountAddress,
        AccountIsPrecompile,
        AccountNonce,
        AccountNonceNew,
        AccountBalance,
        AccountBalanceNew,
        AccountCodeSize,
        AccountCodeSizeNew,
        AccountCodeHash,
        AccountCodeHashNew,
        AccountExists,
        AccountExistsNew,
        AccountWarm,
        AccountWarmNew,
        AccountDeploymentNumber,
        AccountDeploymentNumberNew,
        AccountDeploymentStatus,
        AccountDeploymentStatusNew,
        AccountDeploymentNumberInfty,
        AccountDeploymentStatusInfty,
    ],
    Context => [
        CtxContextNumber,
        CtxCallStackDepth,
        CtxIsRoot,
        CtxIsStatic,
        CtxAccountAddress,
        CtxAccountDeploymentNumber,
        CtxByteCodeAddress,
        CtxByteCodeDeploymentNumber,
        CtxByteCodeDeploymentStatus,
        CtxCallerAddress,
        CtxCallerContextNumber,
        CtxCallValue,
        CtxCallDataSize,
        CtxReturnDataSize,
        CtxUpdate,
        CtxReturnerContextNumber,
    ],
    Storage => [
        StorageAddress,
        StorageDeploymentNumber,
        StorageKey,
        StorageValueOrig,
        StorageValueCurr,
        StorageValueNext,
        StorageWarm,
        StorageWarmNew,
        StorageValueOrigIsZero,
        StorageValueCurrIsOrig,
        StorageValueCurrIsZero,
        StorageValueNextIsCurr,
        StorageValueNextIsZero,
        StorageValueNextIsOrig,
    ],
    Transaction => [
        TxnFrom,
        TxnTo,
        TxnCoinbase,
        TxnNonce,
        TxnValue,
        TxnGasLimit,
        TxnGasPrice,
        TxnBaseFee,
        TxnIsDeployment,
        TxnCallDataSize,
        TxnRequiresEvmExecution,
        TxnStatusCode,
        TxnLeftoverGas,
        TxnGasRefundAmount,
    ],
    Copy => [
        CopyInstruction,
        CopySourceContext,
        CopySourceAddress,
        CopyTargetContext,
        CopySourceOffset,
        CopyTargetOffset,
        CopySize,
    ],
}
